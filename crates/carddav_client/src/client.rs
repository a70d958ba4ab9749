//! CardDAV client
//!
//! Talks to one address book collection. Listing uses `PROPFIND` with
//! `Depth: 1`; writes are plain `PUT`/`DELETE` requests guarded by
//! `If-Match` / `If-None-Match` so that concurrent changes on the server are
//! detected by the server itself.

use std::sync::Arc;

use async_trait::async_trait;
use hyper::ext::ReasonPhrase;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::CardDavConfig;
use crate::dialect::ServerDialect;
use crate::error::{CardDavError, reason_phrase};
use crate::headers::{
    self, ANY_ETAG, CONTENT_TYPE, DAV, DEPTH, DEPTH_ONE, ETAG, IF_MATCH, IF_NONE_MATCH,
    VCARD_CONTENT_TYPE, XML_CONTENT_TYPE,
};
use crate::href::{HrefGenerator, RandomHrefGenerator};
use crate::multistatus::{AddressBook, parse_multistatus};
use crate::retry::{Attempt, retry_on_conflict};

/// Names tried by a single create before giving up
pub const MAX_CREATE_ATTEMPTS: u32 = 5;

/// DAV compliance class required for listing
pub const ADDRESSBOOK_CAPABILITY: &str = "addressbook";

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:">
  <D:prop>
    <D:resourcetype/>
    <D:getcontenttype/>
    <D:getetag/>
  </D:prop>
</D:propfind>"#;

/// Address book location, split once into authority and path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    resource: String,
    base: String,
    path: String,
}

impl CollectionRef {
    /// Split an absolute `http(s)` URL into `scheme://host[:port]` and path
    pub fn parse(resource_url: &str) -> Result<Self, CardDavError> {
        let url = Url::parse(resource_url)
            .map_err(|e| CardDavError::InvalidConfig(format!("resource url {resource_url}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
            return Err(CardDavError::InvalidConfig(format!(
                "resource url {resource_url}: expected an http(s) URL with a host"
            )));
        }

        Ok(Self {
            resource: resource_url.to_string(),
            base: url.origin().ascii_serialization(),
            path: url.path().to_string(),
        })
    }

    /// The URL as configured
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// `scheme://host[:port]`
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Server-relative path of the collection
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absolute URL of a server-relative href (used verbatim)
    pub fn resolve(&self, href: &str) -> String {
        format!("{}{href}", self.base)
    }

    /// Server-relative href and absolute URL of `<name>.vcf` in this collection
    fn member(&self, name: &str) -> (String, String) {
        let href = format!("{}/{name}.vcf", self.path.trim_end_matches('/'));
        let url = format!("{}/{name}.vcf", self.resource.trim_end_matches('/'));
        (href, url)
    }
}

/// A vCard stored by [`CardDavClient::create`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCard {
    /// Server-relative path of the new resource
    pub href: String,
    /// ETag from the response, empty if the server sent none
    pub etag: String,
}

/// CardDAV client trait for address book operations
#[async_trait]
pub trait CardDavClient: Send + Sync {
    /// Probe the server root with `OPTIONS` and classify the implementation
    async fn detect_server(&self) -> Result<ServerDialect, CardDavError>;

    /// List the vCards of the collection with their ETags
    async fn list(&self) -> Result<AddressBook, CardDavError>;

    /// Download the raw vCard at a server-relative href
    async fn fetch(&self, href: &str) -> Result<Vec<u8>, CardDavError>;

    /// Store a new vCard under a freshly generated name
    async fn create(&self, card: &str) -> Result<CreatedCard, CardDavError>;

    /// Replace a vCard. With `Some(etag)` the server only accepts the write
    /// if its current ETag matches; with `None` the write is unconditional.
    async fn update(&self, href: &str, card: &str, etag: Option<&str>)
    -> Result<(), CardDavError>;

    /// Delete a vCard, conditional on `etag` the same way as [`Self::update`]
    async fn delete(&self, href: &str, etag: Option<&str>) -> Result<(), CardDavError>;
}

/// HTTP-based CardDAV client implementation
pub struct HttpCardDavClient {
    client: Client,
    config: CardDavConfig,
    collection: CollectionRef,
    headers: HeaderMap,
    propfind: Method,
    hrefs: Arc<dyn HrefGenerator>,
}

impl std::fmt::Debug for HttpCardDavClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCardDavClient")
            .field("config", &self.config)
            .field("collection", &self.collection)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpCardDavClient {
    /// Create a new CardDAV client
    pub fn new(config: CardDavConfig) -> Result<Self, CardDavError> {
        let collection = CollectionRef::parse(&config.resource_url)?;
        let headers = headers::default_headers(&config.user_agent)?;
        let propfind = Method::from_bytes(b"PROPFIND")
            .map_err(|e| CardDavError::InvalidConfig(e.to_string()))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_certs)
            .default_headers(headers.clone())
            .build()
            .map_err(|e| CardDavError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            collection,
            headers,
            propfind,
            hrefs: Arc::new(RandomHrefGenerator),
        })
    }

    /// Replace the generator used to name new vCards
    #[must_use]
    pub fn with_href_generator(mut self, generator: impl HrefGenerator + 'static) -> Self {
        self.hrefs = Arc::new(generator);
        self
    }

    pub const fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    /// Headers sent with every request
    pub const fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub const fn write_support(&self) -> bool {
        self.config.write_support
    }

    fn ensure_write_support(&self) -> Result<(), CardDavError> {
        if self.config.write_support {
            Ok(())
        } else {
            Err(CardDavError::WriteSupportDisabled)
        }
    }

    /// Build a request with proper authentication
    fn build_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
    }

    fn put_vcard(&self, url: &str, card: &str) -> RequestBuilder {
        self.build_request(Method::PUT, url)
            .header(CONTENT_TYPE, VCARD_CONTENT_TYPE)
            .body(card.to_owned())
    }

    async fn send(request: RequestBuilder) -> Result<Response, CardDavError> {
        request
            .send()
            .await
            .map_err(|e| CardDavError::from_transport(&e))
    }

    /// One create attempt against a fresh name
    async fn try_create(&self, card: &str) -> Result<Attempt<CreatedCard>, CardDavError> {
        let (href, url) = self.collection.member(&self.hrefs.generate());
        debug!(href = %href, "Attempting create-only PUT");

        let response = Self::send(self.put_vcard(&url, card).header(IF_NONE_MATCH, ANY_ETAG)).await?;

        match response.status() {
            status if status.is_success() => {
                let etag = response_etag(response.headers());
                Ok(Attempt::Done(CreatedCard { href, etag }))
            },
            StatusCode::PRECONDITION_FAILED => Ok(Attempt::Conflict(response_reason(&response))),
            StatusCode::UNAUTHORIZED => Err(CardDavError::AuthenticationFailed),
            status => Err(CardDavError::WriteFailed {
                status,
                reason: response_reason(&response),
            }),
        }
    }
}

/// Fail unless some `DAV` header advertises the addressbook capability
fn ensure_addressbook(headers: &HeaderMap) -> Result<(), CardDavError> {
    let values: Vec<&str> = headers
        .get_all(DAV)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    if values.is_empty() {
        return Err(CardDavError::ProtocolMismatch(
            "response carries no DAV header".to_string(),
        ));
    }
    if !values.iter().any(|v| v.contains(ADDRESSBOOK_CAPABILITY)) {
        return Err(CardDavError::ProtocolMismatch(format!(
            "DAV header `{}` does not advertise {ADDRESSBOOK_CAPABILITY}",
            values.join(", ")
        )));
    }
    Ok(())
}

fn response_etag(headers: &HeaderMap) -> String {
    headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Reason phrase as sent by the server, or the canonical one for the status
fn response_reason(response: &Response) -> String {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
        .map_or_else(|| reason_phrase(response.status()), str::to_string)
}

/// Body of a failed response. A body that cannot be read is reported in its place.
fn failure_body<E: std::fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read error response body");
        format!("<unreadable body: {e}>")
    })
}

/// Map a failed read response to an error
fn read_failure(response: &Response, target: &str) -> CardDavError {
    match response.status() {
        StatusCode::UNAUTHORIZED => CardDavError::AuthenticationFailed,
        StatusCode::NOT_FOUND => CardDavError::NotFound(target.to_string()),
        status => CardDavError::RequestFailed {
            status,
            reason: response_reason(response),
        },
    }
}

#[async_trait]
impl CardDavClient for HttpCardDavClient {
    #[instrument(skip(self), fields(base = %self.collection.base()))]
    async fn detect_server(&self) -> Result<ServerDialect, CardDavError> {
        let response =
            Self::send(self.build_request(Method::OPTIONS, self.collection.base())).await?;

        debug!(status = %response.status(), "Received OPTIONS response");

        let dialect = ServerDialect::from_headers(response.headers());
        info!(dialect = %dialect, "{dialect} detected");
        Ok(dialect)
    }

    #[instrument(skip(self), fields(collection = %self.collection.resource()))]
    async fn list(&self) -> Result<AddressBook, CardDavError> {
        let response = Self::send(
            self.build_request(self.propfind.clone(), self.collection.resource())
                .header(DEPTH, DEPTH_ONE)
                .header(CONTENT_TYPE, XML_CONTENT_TYPE)
                .body(PROPFIND_BODY),
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(read_failure(&response, self.collection.resource()));
        }

        ensure_addressbook(response.headers())?;

        let body = response
            .text()
            .await
            .map_err(|e| CardDavError::from_transport(&e))?;

        debug!(body_length = body.len(), "Received PROPFIND response");

        let book = parse_multistatus(&body)?;
        debug!(cards = book.len(), "Parsed address book listing");
        Ok(book)
    }

    #[instrument(skip(self), fields(href = %href))]
    async fn fetch(&self, href: &str) -> Result<Vec<u8>, CardDavError> {
        let url = self.collection.resolve(href);
        let response = Self::send(self.build_request(Method::GET, &url)).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(read_failure(&response, href));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CardDavError::from_transport(&e))?;

        debug!(body_length = body.len(), "Received vCard");
        Ok(body.to_vec())
    }

    #[instrument(skip(self, card), fields(collection = %self.collection.resource()))]
    async fn create(&self, card: &str) -> Result<CreatedCard, CardDavError> {
        self.ensure_write_support()?;

        let created = retry_on_conflict(MAX_CREATE_ATTEMPTS, move |_| self.try_create(card)).await?;

        info!(href = %created.href, etag = %created.etag, "Created vCard");
        Ok(created)
    }

    #[instrument(skip(self, card), fields(href = %href, conditional = etag.is_some()))]
    async fn update(
        &self,
        href: &str,
        card: &str,
        etag: Option<&str>,
    ) -> Result<(), CardDavError> {
        self.ensure_write_support()?;

        let url = self.collection.resolve(href);
        let mut request = self.put_vcard(&url, card);
        if let Some(etag) = etag {
            request = request.header(IF_MATCH, headers::if_match(etag)?);
        }

        let response = Self::send(request).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(CardDavError::AuthenticationFailed),
            status => Err(CardDavError::WriteFailed {
                status,
                reason: response_reason(&response),
            }),
        }
    }

    #[instrument(skip(self), fields(href = %href, conditional = etag.is_some()))]
    async fn delete(&self, href: &str, etag: Option<&str>) -> Result<(), CardDavError> {
        self.ensure_write_support()?;

        let url = self.collection.resolve(href);
        let mut request = self.build_request(Method::DELETE, &url);
        if let Some(etag) = etag {
            request = request.header(IF_MATCH, headers::if_match(etag)?);
        }

        let response = Self::send(request).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let reason = response_reason(&response);
        let body = failure_body(response.text().await);
        Err(CardDavError::DeleteFailed {
            status,
            reason,
            body,
        })
    }
}
