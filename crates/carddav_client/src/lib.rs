#![forbid(unsafe_code)]
//! CardDAV client
//!
//! Lists, fetches and mutates the vCards of a single remote address book.
//! Writes are conditional on server ETags; vCard payloads are passed through
//! untouched.

pub mod client;
pub mod config;
pub mod dialect;
pub mod error;
pub mod headers;
pub mod href;
pub mod multistatus;
mod retry;

pub use client::{
    CardDavClient, CollectionRef, CreatedCard, HttpCardDavClient, MAX_CREATE_ATTEMPTS,
};
pub use config::CardDavConfig;
pub use dialect::ServerDialect;
pub use error::CardDavError;
pub use href::{HrefGenerator, RandomHrefGenerator, random_href};
pub use multistatus::{AddressBook, parse_multistatus};
