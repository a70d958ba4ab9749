//! carddav-cli
//!
//! Command-line access to a single CardDAV address book.

#![allow(clippy::print_stdout)]

mod config;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use carddav_client::{CardDavClient, HttpCardDavClient};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

/// carddav-cli
#[derive(Parser)]
#[command(name = "carddav-cli")]
#[command(author, version, about = "CardDAV address book client", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ./carddav.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable create, update and delete for this run
    #[arg(long, global = true)]
    write: bool,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the server implementation
    Detect,

    /// List vCards with their ETags
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the raw vCard at a server-relative href
    Get {
        /// Server-relative href (as printed by `list`)
        href: String,
    },

    /// Upload a new vCard under a generated name
    ///
    /// Example: carddav-cli --write create --file alice.vcf
    Create {
        /// vCard file (reads stdin if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Replace an existing vCard
    ///
    /// Without --etag the server copy is overwritten unconditionally.
    Update {
        /// Server-relative href
        href: String,

        /// Only write if the server's ETag still matches
        #[arg(long)]
        etag: Option<String>,

        /// vCard file (reads stdin if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a vCard
    ///
    /// Without --etag the card is deleted unconditionally.
    Delete {
        /// Server-relative href
        href: String,

        /// Only delete if the server's ETag still matches
        #[arg(long)]
        etag: Option<String>,
    },
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Read a vCard from a file, or from stdin when no path is given
fn read_payload(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut card = String::new();
            std::io::stdin()
                .read_to_string(&mut card)
                .context("reading vCard from stdin")?;
            Ok(card)
        },
    }
}

/// One `href<TAB>etag` line per card
fn format_listing<'a>(entries: impl IntoIterator<Item = (&'a String, &'a String)>) -> String {
    entries
        .into_iter()
        .map(|(href, etag)| format!("{href}\t{etag}\n"))
        .collect()
}

async fn run(client: &dyn CardDavClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Detect => {
            let dialect = client.detect_server().await?;
            println!("{dialect}");
        },

        Commands::List { json } => {
            let book = client.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&book)?);
            } else {
                print!("{}", format_listing(&book));
            }
        },

        Commands::Get { href } => {
            let payload = client.fetch(&href).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&payload)?;
            stdout.flush()?;
        },

        Commands::Create { file } => {
            let card = read_payload(file.as_deref())?;
            let created = client.create(&card).await?;
            println!("{}\t{}", created.href, created.etag);
        },

        Commands::Update { href, etag, file } => {
            let card = read_payload(file.as_deref())?;
            client.update(&href, &card, etag.as_deref()).await?;
            println!("updated {href}");
        },

        Commands::Delete { href, etag } => {
            client.delete(&href, etag.as_deref()).await?;
            println!("deleted {href}");
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter_from_verbosity(cli.verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut app_config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.write {
        app_config.write_support = true;
    }
    if cli.insecure {
        app_config.verify_certs = false;
    }
    tracing::debug!(config = ?app_config, "Loaded configuration");

    let client = HttpCardDavClient::new(app_config.to_client_config())?;
    run(&client, cli.command).await
}
