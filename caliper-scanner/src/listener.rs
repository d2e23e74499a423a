use crate::normalize::SeedSpec;
use crate::result::{CrawlAudit, FetchRequest, PageRecord};

/// Crawl lifecycle hooks, invoked synchronously by the engine.
///
/// Every request the engine queues is reported once through `on_queued`;
/// requests that are later abandoned without producing a record are reported
/// through `on_dropped`, so `queued - dropped - recorded` is the outstanding work.
pub trait CrawlListener: Send + Sync {
    fn on_started(&self, _seed: &SeedSpec) {}

    fn on_queued(&self, _request: &FetchRequest) {}

    fn on_dropped(&self, _request: &FetchRequest) {}

    fn on_recorded(&self, _record: &PageRecord) {}

    fn on_finished(&self, _audit: &CrawlAudit) {}
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl CrawlListener for NoopListener {}
