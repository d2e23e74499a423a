use caliper_scanner::{CrawlAudit, CrawlListener, FetchRequest, PageRecord, SeedSpec};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const BAR_TEMPLATE: &str = "URL: {msg}\n{wide_bar:.cyan/blue} {pos}/{len} {percent:>3}% [{elapsed_precise}]";

/// Progress bar driven by crawl events.
///
/// The bar's length is every request queued minus those dropped, its position
/// the number of pages recorded, so it only reaches 100% once the crawl drains.
pub struct ProgressListener {
    bar: ProgressBar,
    queued: AtomicU64,
    dropped: AtomicU64,
}

impl ProgressListener {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self::with_bar(bar)
    }

    /// A listener that keeps count but draws nothing.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            queued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    /// Requests still expected to produce a record, including those already recorded.
    pub fn total(&self) -> u64 {
        self.queued
            .load(Ordering::SeqCst)
            .saturating_sub(self.dropped.load(Ordering::SeqCst))
    }

    fn refresh_length(&self) {
        self.bar.set_length(self.total());
    }
}

impl Default for ProgressListener {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlListener for ProgressListener {
    fn on_started(&self, seed: &SeedSpec) {
        self.bar.set_message(seed.start_url().to_string());
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_queued(&self, _request: &FetchRequest) {
        self.queued.fetch_add(1, Ordering::SeqCst);
        self.refresh_length();
    }

    fn on_dropped(&self, _request: &FetchRequest) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
        self.refresh_length();
    }

    fn on_recorded(&self, record: &PageRecord) {
        self.bar.set_message(record.url.clone());
        self.bar.inc(1);
    }

    fn on_finished(&self, _audit: &CrawlAudit) {
        let recorded = self.bar.position();
        self.bar
            .finish_with_message(format!("crawl complete, {} pages recorded", recorded));
    }
}
