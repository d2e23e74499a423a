use crate::normalize::NormalizedUrl;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Response headers the crawler cares about. Absent headers stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub content_length: Option<u64>,
    pub location: Option<String>,
}

impl Headers {
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Media type without parameters, lowercased (`text/html; charset=utf-8` -> `text/html`).
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// A URL the frontier accepted and the transport should fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: NormalizedUrl,
    pub referrer: Option<NormalizedUrl>,
}

impl FetchRequest {
    pub fn new(url: NormalizedUrl, referrer: Option<NormalizedUrl>) -> Self {
        Self { url, referrer }
    }
}

/// A completed fetch, as handed over by the transport.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: NormalizedUrl,
    pub status_code: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub referrer: Option<NormalizedUrl>,
}

impl FetchResponse {
    pub fn new(request: &FetchRequest, status_code: u16, headers: Headers, body: Vec<u8>) -> Self {
        Self {
            url: request.url.clone(),
            status_code,
            headers,
            body,
            referrer: request.referrer.clone(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Metadata recorded for every processed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub content_length: Option<u64>,
    /// Bytes actually received, which may differ from `content_length`.
    #[serde(rename = "size")]
    pub byte_size: usize,
    /// Only the first page the URL was discovered on.
    pub referrer: Option<String>,
    pub timestamp: String,
}

impl PageRecord {
    pub fn from_response(response: &FetchResponse) -> Self {
        Self {
            url: response.url.to_string(),
            status_code: response.status_code,
            content_type: response.headers.content_type.clone(),
            last_modified: response.headers.last_modified.clone(),
            content_length: response.headers.content_length,
            byte_size: response.body.len(),
            referrer: response.referrer.as_ref().map(ToString::to_string),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IframeObservation {
    pub source_url: String,
    pub iframe_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObservation {
    pub url: String,
    pub status_code: u16,
    pub referrer: Option<String>,
}

/// Append-only audit trail for a single crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlAudit {
    iframes: Vec<IframeObservation>,
    errors: Vec<ErrorObservation>,
}

impl CrawlAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_iframe(&mut self, source_url: &NormalizedUrl, iframe_url: &str) {
        self.iframes.push(IframeObservation {
            source_url: source_url.to_string(),
            iframe_url: iframe_url.to_string(),
        });
    }

    pub fn record_error(&mut self, response: &FetchResponse) {
        self.errors.push(ErrorObservation {
            url: response.url.to_string(),
            status_code: response.status_code,
            referrer: response.referrer.as_ref().map(ToString::to_string),
        });
    }

    pub fn iframes(&self) -> &[IframeObservation] {
        &self.iframes
    }

    pub fn errors(&self) -> &[ErrorObservation] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.iframes.is_empty() && self.errors.is_empty()
    }
}
