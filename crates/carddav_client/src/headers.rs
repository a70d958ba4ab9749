//! Header names and values used on the wire
//!
//! Standard names come from `reqwest::header`; WebDAV-only names are
//! declared here so every request uses the same spelling.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::error::CardDavError;

pub use reqwest::header::{CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH};

/// Recursion depth of a PROPFIND
pub const DEPTH: HeaderName = HeaderName::from_static("depth");
/// Compliance classes advertised by a DAV resource
pub const DAV: HeaderName = HeaderName::from_static("dav");
/// Version header sent by SabreDAV based servers (ownCloud, Nextcloud, Baïkal)
pub const X_SABRE_VERSION: HeaderName = HeaderName::from_static("x-sabre-version");
/// Version header sent by DAViCal
pub const X_DAVICAL_VERSION: HeaderName = HeaderName::from_static("x-davical-version");

/// Content type of every vCard write
pub const VCARD_CONTENT_TYPE: HeaderValue = HeaderValue::from_static("text/vcard");
pub const XML_CONTENT_TYPE: HeaderValue =
    HeaderValue::from_static("application/xml; charset=utf-8");
/// `If-None-Match: *` makes a PUT create-only
pub const ANY_ETAG: HeaderValue = HeaderValue::from_static("*");
pub const DEPTH_ONE: HeaderValue = HeaderValue::from_static("1");

/// Build the headers attached to every request
pub fn default_headers(user_agent: &str) -> Result<HeaderMap, CardDavError> {
    let value = HeaderValue::from_str(user_agent)
        .map_err(|e| CardDavError::InvalidConfig(format!("user agent: {e}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, value);
    Ok(headers)
}

/// Value of an `If-Match` header for the given ETag
pub fn if_match(etag: &str) -> Result<HeaderValue, CardDavError> {
    HeaderValue::from_str(etag).map_err(|e| CardDavError::InvalidConfig(format!("etag: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_headers_carry_user_agent() {
        let headers = default_headers("carddav-client/1.0").expect("headers");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[USER_AGENT], "carddav-client/1.0");
    }

    #[test]
    fn default_headers_reject_control_characters() {
        let result = default_headers("bad\nagent");
        assert!(matches!(result, Err(CardDavError::InvalidConfig(_))));
    }

    #[test]
    fn if_match_keeps_quotes_and_empty_values() {
        assert_eq!(if_match("\"abc\"").expect("quoted"), "\"abc\"");
        assert_eq!(if_match("").expect("empty"), "");
    }

    #[test]
    fn webdav_names_are_lowercase() {
        assert_eq!(DEPTH.as_str(), "depth");
        assert_eq!(X_SABRE_VERSION.as_str(), "x-sabre-version");
    }
}
