//! Client configuration

use serde::{Deserialize, Serialize};

/// CardDAV address book configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct CardDavConfig {
    /// Full URL of the address book collection
    /// (e.g., <https://dav.example.com/addressbooks/user/default>)
    pub resource_url: String,
    /// Username
    pub username: String,
    /// Password (excluded from serialization to prevent leaks)
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Verify TLS certificates (default: true)
    #[serde(default = "default_true")]
    pub verify_certs: bool,
    /// Allow create, update and delete (default: false)
    #[serde(default)]
    pub write_support: bool,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// `User-Agent` sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl std::fmt::Debug for CardDavConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDavConfig")
            .field("resource_url", &self.resource_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("verify_certs", &self.verify_certs)
            .field("write_support", &self.write_support)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

const fn default_true() -> bool {
    true
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("carddav-client/", env!("CARGO_PKG_VERSION")).to_string()
}

impl CardDavConfig {
    /// Read-only configuration with default transport settings
    pub fn new(
        resource_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            resource_url: resource_url.into(),
            username: username.into(),
            password: password.into(),
            verify_certs: true,
            write_support: false,
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }

    /// Enable or disable create, update and delete
    #[must_use]
    pub const fn with_write_support(mut self, enabled: bool) -> Self {
        self.write_support = enabled;
        self
    }

    /// Toggle TLS certificate verification
    #[must_use]
    pub const fn with_verify_certs(mut self, verify: bool) -> Self {
        self.verify_certs = verify;
        self
    }

    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let config = CardDavConfig::new("https://dav.example.com/ab", "user", "secret123");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret123"));
    }

    #[test]
    fn serialization_excludes_password() {
        let config = CardDavConfig::new("https://dav.example.com/ab", "user", "secret");
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(!json.contains("secret"));
        assert!(json.contains("dav.example.com"));
    }

    #[test]
    fn deserialization_defaults() {
        let json = r#"{"resource_url":"https://dav.example.com/ab","username":"user"}"#;
        let config: CardDavConfig = serde_json::from_str(json).expect("deserialize");
        assert!(config.verify_certs);
        assert!(!config.write_support);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.password.is_empty());
        assert!(config.user_agent.starts_with("carddav-client/"));
    }

    #[test]
    fn builders_override_defaults() {
        let config = CardDavConfig::new("https://dav.example.com/ab", "user", "pw")
            .with_write_support(true)
            .with_verify_certs(false)
            .with_timeout_secs(5);
        assert!(config.write_support);
        assert!(!config.verify_certs);
        assert_eq!(config.timeout_secs, 5);
    }
}
