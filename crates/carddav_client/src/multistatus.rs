//! PROPFIND multistatus parsing
//!
//! Turns a `DAV:multistatus` document into a map of vCard hrefs to ETags.
//! Elements are matched by namespace URI and local name, so any prefix
//! (`D:`, `d:`, default namespace) is accepted.
//!
//! Expected layout, relative to the document root:
//!
//! ```text
//! multistatus
//! └── response*
//!     ├── href
//!     └── propstat*
//!         └── prop
//!             ├── getcontenttype
//!             └── getetag
//! ```

use std::collections::BTreeMap;

use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{LocalName, Namespace, ResolveResult};
use tracing::debug;

use crate::error::CardDavError;

/// Snapshot of an address book: href → ETag.
///
/// A card listed without a `getetag` property maps to an empty string.
pub type AddressBook = BTreeMap<String, String>;

/// Content types that mark a member as a vCard
pub const VCARD_CONTENT_TYPES: [&str; 2] = ["text/vcard", "text/x-vcard"];

/// Namespace URI of WebDAV elements
pub const DAV_NS: &str = "DAV:";

/// Namespace-qualified element name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifiedName {
    pub namespace: &'static str,
    pub local: &'static str,
}

impl QualifiedName {
    pub const fn dav(local: &'static str) -> Self {
        Self {
            namespace: DAV_NS,
            local,
        }
    }

    /// Whether a resolved element name refers to this qualified name
    pub fn matches(&self, ns: &ResolveResult<'_>, local: LocalName<'_>) -> bool {
        matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == self.namespace.as_bytes())
            && local.as_ref() == self.local.as_bytes()
    }
}

pub const RESPONSE: QualifiedName = QualifiedName::dav("response");
pub const HREF: QualifiedName = QualifiedName::dav("href");
pub const PROPSTAT: QualifiedName = QualifiedName::dav("propstat");
pub const PROP: QualifiedName = QualifiedName::dav("prop");
pub const GETCONTENTTYPE: QualifiedName = QualifiedName::dav("getcontenttype");
pub const GETETAG: QualifiedName = QualifiedName::dav("getetag");

// Element depths, counting the document root as 1.
const RESPONSE_DEPTH: usize = 2;
const PROPSTAT_DEPTH: usize = 3;
const PROP_DEPTH: usize = 4;
const PROPERTY_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Href,
    ContentType,
    Etag,
}

#[derive(Debug, Default)]
struct PendingResponse {
    href: Option<String>,
    etag: String,
    is_vcard: bool,
}

impl PendingResponse {
    fn commit(&mut self, target: Capture, text: String) {
        match target {
            Capture::Href => self.href = Some(text),
            Capture::ContentType => self.is_vcard |= is_vcard_content_type(&text),
            Capture::Etag => self.etag = text,
        }
    }
}

/// Whether a `getcontenttype` value marks a vCard. Parameters such as
/// `; charset=utf-8` are not stripped.
pub fn is_vcard_content_type(value: &str) -> bool {
    VCARD_CONTENT_TYPES.contains(&value)
}

/// Parse a PROPFIND response body into an [`AddressBook`].
///
/// Only `response` elements whose properties include a vCard content type
/// are kept. Hrefs are used verbatim (no percent-decoding, no slash
/// normalization); a repeated href keeps the last entry. An empty or
/// whitespace-only body yields an empty map.
///
/// # Errors
///
/// Returns [`CardDavError::ParseError`] for malformed XML: documents that
/// end with unclosed elements, lack a root element or have more than one,
/// carry text outside the root, or use an undeclared namespace prefix.
pub fn parse_multistatus(xml: &str) -> Result<AddressBook, CardDavError> {
    if xml.trim().is_empty() {
        return Ok(AddressBook::new());
    }

    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut book = AddressBook::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut response: Option<PendingResponse> = None;
    let mut in_propstat = false;
    let mut in_prop = false;
    let mut capture: Option<(Capture, usize)> = None;
    let mut text = String::new();

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| CardDavError::ParseError(e.to_string()))?;

        match event {
            Event::Start(e) => {
                open_element(&ns, depth, &mut seen_root)?;
                depth += 1;
                let local = e.local_name();
                let target = match depth {
                    RESPONSE_DEPTH if RESPONSE.matches(&ns, local) => {
                        response = Some(PendingResponse::default());
                        None
                    },
                    PROPSTAT_DEPTH if response.is_some() => {
                        if HREF.matches(&ns, local) {
                            Some(Capture::Href)
                        } else {
                            in_propstat = PROPSTAT.matches(&ns, local);
                            None
                        }
                    },
                    PROP_DEPTH if in_propstat => {
                        in_prop = PROP.matches(&ns, local);
                        None
                    },
                    PROPERTY_DEPTH if in_prop => {
                        if GETCONTENTTYPE.matches(&ns, local) {
                            Some(Capture::ContentType)
                        } else if GETETAG.matches(&ns, local) {
                            Some(Capture::Etag)
                        } else {
                            None
                        }
                    },
                    _ => None,
                };
                if let Some(target) = target {
                    text.clear();
                    capture = Some((target, depth));
                }
            },
            Event::Empty(_) => open_element(&ns, depth, &mut seen_root)?,
            Event::Text(e) if depth == 0 && !e.iter().all(u8::is_ascii_whitespace) => {
                return Err(CardDavError::ParseError(
                    "text outside the root element".to_string(),
                ));
            },
            Event::CData(_) if depth == 0 => {
                return Err(CardDavError::ParseError(
                    "CDATA outside the root element".to_string(),
                ));
            },
            Event::Text(e) if capture.is_some() => {
                let unescaped = e
                    .unescape()
                    .map_err(|e| CardDavError::ParseError(e.to_string()))?;
                text.push_str(&unescaped);
            },
            Event::CData(e) if capture.is_some() => {
                let raw = std::str::from_utf8(e.as_ref())
                    .map_err(|e| CardDavError::ParseError(e.to_string()))?;
                text.push_str(raw);
            },
            Event::End(_) => {
                if let Some((target, _)) = capture.filter(|&(_, at)| at == depth) {
                    capture = None;
                    if let Some(pending) = response.as_mut() {
                        pending.commit(target, std::mem::take(&mut text));
                    }
                }
                match depth {
                    RESPONSE_DEPTH => {
                        if let Some(pending) = response.take() {
                            insert_response(&mut book, pending);
                        }
                    },
                    PROPSTAT_DEPTH => in_propstat = false,
                    PROP_DEPTH => in_prop = false,
                    _ => {},
                }
                depth = depth.saturating_sub(1);
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if depth != 0 {
        return Err(CardDavError::ParseError(format!(
            "document ended with {depth} unclosed element(s)"
        )));
    }
    if !seen_root {
        return Err(CardDavError::ParseError(
            "document has no root element".to_string(),
        ));
    }

    Ok(book)
}

/// Checks shared by `Start` and `Empty` events, called before `depth` changes
fn open_element(
    ns: &ResolveResult<'_>,
    depth: usize,
    seen_root: &mut bool,
) -> Result<(), CardDavError> {
    if let ResolveResult::Unknown(prefix) = ns {
        return Err(CardDavError::ParseError(format!(
            "undeclared namespace prefix `{}`",
            String::from_utf8_lossy(prefix)
        )));
    }
    if depth == 0 {
        if *seen_root {
            return Err(CardDavError::ParseError(
                "more than one root element".to_string(),
            ));
        }
        *seen_root = true;
    }
    Ok(())
}

fn insert_response(book: &mut AddressBook, pending: PendingResponse) {
    if !pending.is_vcard {
        return;
    }
    match pending.href {
        Some(href) => {
            book.insert(href, pending.etag);
        },
        None => debug!("Skipping vCard response without href"),
    }
}
