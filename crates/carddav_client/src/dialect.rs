//! Server implementation detection
//!
//! Purely informational: every dialect is driven through the same CardDAV
//! requests.

use std::fmt;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::headers::{X_DAVICAL_VERSION, X_SABRE_VERSION};

/// Known CardDAV server families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerDialect {
    /// SabreDAV and servers built on it (ownCloud, Nextcloud, Baïkal)
    SabreDav,
    Davical,
    Unknown,
}

impl ServerDialect {
    /// Classify from `OPTIONS` response headers.
    ///
    /// `X-Sabre-Version` is checked before `X-DAViCal-Version`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if headers.contains_key(X_SABRE_VERSION) {
            Self::SabreDav
        } else if headers.contains_key(X_DAVICAL_VERSION) {
            Self::Davical
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for ServerDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SabreDav => write!(f, "sabredav"),
            Self::Davical => write!(f, "davical"),
            Self::Unknown => write!(f, "unknown server"),
        }
    }
}
