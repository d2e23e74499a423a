use crate::error::{Rejected, Result, ScanError};
use std::fmt;
use url::Url;

/// Schemes that are never followed, matched case-insensitively on the raw candidate.
const DISALLOWED_SCHEMES: [&str; 2] = ["mailto:", "javascript:"];

/// Absolute, fragment-free URL used as the frontier's identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    fn from_url(mut url: Url) -> Self {
        url.set_fragment(None);
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// `host[:port]` of this URL, the unit of scope comparison.
    pub fn authority(&self) -> Option<String> {
        authority(&self.0)
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// The crawl's seed, fixed for the lifetime of a crawl.
#[derive(Debug, Clone)]
pub struct SeedSpec {
    start_url: NormalizedUrl,
    scope_domain: String,
}

impl SeedSpec {
    pub fn new(start_url: &str) -> Result<Self> {
        let parsed = Url::parse(start_url.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", start_url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(format!(
                "{}: only http and https seeds can be crawled",
                start_url
            )));
        }

        let scope_domain = authority(&parsed)
            .ok_or_else(|| ScanError::InvalidUrl(format!("{}: missing host", start_url)))?;

        Ok(Self {
            start_url: NormalizedUrl::from_url(parsed),
            scope_domain,
        })
    }

    pub fn start_url(&self) -> &NormalizedUrl {
        &self.start_url
    }

    pub fn scope_domain(&self) -> &str {
        &self.scope_domain
    }

    pub fn robots_url(&self) -> NormalizedUrl {
        // Joining an absolute path onto an http(s) URL cannot fail
        let url = self
            .start_url
            .as_url()
            .join("/robots.txt")
            .unwrap_or_else(|_| self.start_url.as_url().clone());
        NormalizedUrl::from_url(url)
    }
}

/// Resolve `candidate` against `base` and strip its fragment.
pub fn normalize(candidate: &str, base: &Url) -> std::result::Result<NormalizedUrl, Rejected> {
    let trimmed = candidate.trim();

    if let Some(scheme) = DISALLOWED_SCHEMES
        .iter()
        .find(|scheme| has_prefix_ignore_case(trimmed, scheme))
    {
        return Err(Rejected::DisallowedScheme(scheme.trim_end_matches(':').to_string()));
    }

    if trimmed.is_empty() {
        return Err(Rejected::Unresolvable {
            candidate: candidate.to_string(),
            reason: "empty reference".to_string(),
        });
    }

    let resolved = base.join(trimmed).map_err(|e| Rejected::Unresolvable {
        candidate: candidate.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(resolved.scheme(), "http" | "https") {
        return Err(Rejected::UnsupportedScheme(resolved.scheme().to_string()));
    }

    Ok(NormalizedUrl::from_url(resolved))
}

/// Whether a raw candidate stays on the crawl's site.
///
/// Only candidates that already look absolute (start with `http`) are inspected;
/// anything else is treated as same-site, whatever it later resolves to.
pub fn in_scope(candidate: &str, scope_domain: &str) -> bool {
    let trimmed = candidate.trim();
    if !has_prefix_ignore_case(trimmed, "http") {
        return true;
    }

    match Url::parse(trimmed) {
        Ok(url) => authority(&url).as_deref() == Some(scope_domain),
        Err(_) => false,
    }
}

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
