//! CardDAV client errors

use reqwest::StatusCode;
use thiserror::Error;

/// CardDAV client errors
#[derive(Debug, Error)]
pub enum CardDavError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A mutating operation was called on a client built without write support.
    #[error("Write support is disabled for this client")]
    WriteSupportDisabled,

    /// The target does not advertise the `addressbook` DAV capability.
    #[error("Not a CardDAV resource: {0}")]
    ProtocolMismatch(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request failed: {status}")]
    RequestFailed { status: StatusCode, reason: String },

    /// An update was rejected. A `412 Precondition Failed` status means the
    /// supplied ETag no longer matches the server's copy.
    #[error("Write failed: {status}")]
    WriteFailed { status: StatusCode, reason: String },

    /// Every candidate name for a new card was already taken.
    #[error("Upload failed after {attempts} attempts: {reason}")]
    UploadFailed { attempts: u32, reason: String },

    #[error("Delete failed: {status}")]
    DeleteFailed {
        status: StatusCode,
        reason: String,
        body: String,
    },
}

impl CardDavError {
    /// HTTP status carried by the error, if the server answered at all
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RequestFailed { status, .. }
            | Self::WriteFailed { status, .. }
            | Self::DeleteFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server refused a conditional request (`412`)
    pub fn is_precondition_failed(&self) -> bool {
        self.status() == Some(StatusCode::PRECONDITION_FAILED)
    }

    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        Self::ConnectionFailed(err.to_string())
    }
}

/// Reason phrase for a status, `"Unknown"` for non-standard codes
pub(crate) fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}
