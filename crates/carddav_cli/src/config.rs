//! CLI configuration
//!
//! Layered, lowest precedence first: built-in defaults, `carddav.toml` in the
//! working directory (or the file given with `--config`), then `CARDDAV_*`
//! environment variables such as `CARDDAV_RESOURCE_URL`.

use std::path::Path;

use carddav_client::CardDavConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Address book connection settings
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// Address book collection URL
    pub resource_url: String,

    /// Username for authentication
    #[serde(default)]
    pub username: String,

    /// Password for authentication (sensitive - uses `SecretString`)
    #[serde(default = "empty_secret")]
    pub password: SecretString,

    /// Verify TLS certificates (default: true)
    #[serde(default = "default_true")]
    pub verify_certs: bool,

    /// Allow create, update and delete (default: false)
    #[serde(default)]
    pub write_support: bool,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("resource_url", &self.resource_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("verify_certs", &self.verify_certs)
            .field("write_support", &self.write_support)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

const fn default_true() -> bool {
    true
}

const fn default_timeout() -> u64 {
    30
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

impl AppConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("carddav").required(false),
        };

        let builder = config::Config::builder()
            .set_default("verify_certs", true)?
            .set_default("write_support", false)?
            .set_default("timeout_secs", default_timeout())?
            .add_source(file)
            // Override with environment variables (e.g., CARDDAV_RESOURCE_URL)
            .add_source(config::Environment::with_prefix("CARDDAV").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    /// Convert to `carddav_client`'s `CardDavConfig`
    #[must_use]
    pub fn to_client_config(&self) -> CardDavConfig {
        CardDavConfig::new(
            self.resource_url.clone(),
            self.username.clone(),
            self.password.expose_secret().to_string(),
        )
        .with_verify_certs(self.verify_certs)
        .with_write_support(self.write_support)
        .with_timeout_secs(self.timeout_secs)
    }
}
