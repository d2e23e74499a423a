use crate::bootstrap::{locations_from_sitemap_lossy, seed_requests, sitemaps_from_robots};
use crate::classify::{ContentKind, classify};
use crate::extract::extract_links;
use crate::frontier::Frontier;
use crate::listener::CrawlListener;
use crate::normalize::{NormalizedUrl, SeedSpec, in_scope, normalize};
use crate::result::{CrawlAudit, FetchRequest, FetchResponse, PageRecord};
use std::sync::Arc;
use tracing::{debug, warn};

const REDIRECT_STATUSES: [u16; 3] = [301, 302, 303];

/// Everything the engine produced for one response.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub kind: ContentKind,
    pub record: PageRecord,
    /// Newly queued requests, in discovery order.
    pub requests: Vec<FetchRequest>,
}

/// Turns fetched responses into page records, audit entries and new requests.
///
/// Responses are processed one at a time, in the order they are handed in.
/// The frontier is the only state shared with the fetch workers.
pub struct DiscoveryEngine {
    seed: SeedSpec,
    frontier: Arc<Frontier>,
    listener: Arc<dyn CrawlListener>,
    audit: CrawlAudit,
    scope_redirects: bool,
}

impl DiscoveryEngine {
    pub fn new(seed: SeedSpec, frontier: Arc<Frontier>, listener: Arc<dyn CrawlListener>) -> Self {
        Self {
            seed,
            frontier,
            listener,
            audit: CrawlAudit::new(),
            scope_redirects: false,
        }
    }

    /// Apply the domain scope to redirect targets too. Off by default:
    /// redirects are followed wherever they point.
    pub fn with_redirect_scope(mut self, enabled: bool) -> Self {
        self.scope_redirects = enabled;
        self
    }

    pub fn audit(&self) -> &CrawlAudit {
        &self.audit
    }

    /// Whether `url` has ever been accepted by the frontier.
    pub fn is_known(&self, url: &NormalizedUrl) -> bool {
        self.frontier.contains(url)
    }

    /// Announce the crawl and queue the seed page plus robots.txt.
    pub fn start(&mut self) -> Vec<FetchRequest> {
        self.listener.on_started(&self.seed);

        let mut queued = Vec::new();
        for request in seed_requests(&self.seed) {
            self.enqueue(request, &mut queued);
        }
        queued
    }

    pub fn process(&mut self, response: &FetchResponse) -> Discovery {
        debug!("Processing {} ({})", response.url, response.status_code);

        let record = PageRecord::from_response(response);
        self.listener.on_recorded(&record);

        let mut requests = Vec::new();

        if REDIRECT_STATUSES.contains(&response.status_code) {
            self.follow_redirect(response, &mut requests);
        }

        if response.status_code > 400 {
            self.audit.record_error(response);
        }

        let kind = classify(response);
        match kind {
            ContentKind::Html => self.discover_links(response, &mut requests),
            ContentKind::RobotsText => {
                let sitemaps = sitemaps_from_robots(&response.body_text());
                debug!("{} declares {} sitemap(s)", response.url, sitemaps.len());
                self.enqueue_trusted(response, sitemaps, &mut requests);
            }
            ContentKind::XmlSitemap => {
                let (locations, error) = locations_from_sitemap_lossy(&response.body_text());
                if let Some(e) = error {
                    warn!(
                        "Sitemap {} is malformed, keeping {} entries: {}",
                        response.url,
                        locations.len(),
                        e
                    );
                }
                self.enqueue_trusted(response, locations, &mut requests);
            }
            ContentKind::Other => {}
        }

        Discovery {
            kind,
            record,
            requests,
        }
    }

    /// Report a queued request that will never produce a record.
    pub fn drop_request(&self, request: &FetchRequest) {
        debug!("Dropping {}", request.url);
        self.listener.on_dropped(request);
    }

    /// Close the crawl and hand over the audit trail.
    pub fn finish(self) -> CrawlAudit {
        self.listener.on_finished(&self.audit);
        self.audit
    }

    fn follow_redirect(&mut self, response: &FetchResponse, queued: &mut Vec<FetchRequest>) {
        let Some(location) = response.headers.location.as_deref() else {
            warn!(
                "{} redirected ({}) without a Location header",
                response.url, response.status_code
            );
            return;
        };

        let target = match normalize(location, response.url.as_url()) {
            Ok(target) => target,
            Err(rejected) => {
                debug!("Redirect from {} rejected: {}", response.url, rejected);
                return;
            }
        };

        if self.scope_redirects && target.authority().as_deref() != Some(self.seed.scope_domain()) {
            debug!("Redirect from {} leaves scope: {}", response.url, target);
            return;
        }

        self.enqueue(FetchRequest::new(target, Some(response.url.clone())), queued);
    }

    fn discover_links(&mut self, response: &FetchResponse, queued: &mut Vec<FetchRequest>) {
        let extraction = match extract_links(&response.body_text()) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Link extraction failed for {}: {}", response.url, e);
                return;
            }
        };

        for iframe in &extraction.iframes {
            debug!("Iframe on {}: {}", response.url, iframe);
            self.audit.record_iframe(&response.url, iframe);
        }

        let base = extraction
            .base_href
            .as_deref()
            .and_then(|href| response.url.as_url().join(href).ok())
            .unwrap_or_else(|| response.url.as_url().clone());

        for candidate in &extraction.candidates {
            let url = match normalize(candidate, &base) {
                Ok(url) => url,
                Err(rejected) => {
                    debug!("  -> Skipping {:?}: {}", candidate, rejected);
                    continue;
                }
            };

            if !in_scope(candidate, self.seed.scope_domain()) {
                debug!("  -> Off-site, skipping {}", url);
                continue;
            }

            self.enqueue(FetchRequest::new(url, Some(response.url.clone())), queued);
        }
    }

    /// Queue URLs from robots.txt or a sitemap; no scope filter applies.
    fn enqueue_trusted(
        &mut self,
        response: &FetchResponse,
        urls: Vec<String>,
        queued: &mut Vec<FetchRequest>,
    ) {
        for raw in urls {
            match normalize(&raw, response.url.as_url()) {
                Ok(url) => {
                    self.enqueue(FetchRequest::new(url, Some(response.url.clone())), queued)
                }
                Err(rejected) => {
                    debug!("  -> Skipping {:?} from {}: {}", raw, response.url, rejected)
                }
            }
        }
    }

    fn enqueue(&self, request: FetchRequest, queued: &mut Vec<FetchRequest>) {
        if self.frontier.offer(request.clone()) {
            debug!("  -> Queued {}", request.url);
            self.listener.on_queued(&request);
            queued.push(request);
        }
    }
}
