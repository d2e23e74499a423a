use crate::progress::ProgressListener;
use caliper_scanner::error::Result;
use caliper_scanner::{CrawlAudit, CrawlOutcome, Crawler, JsonLinesSink, SeedSpec};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub url: String,
    pub workers: usize,
    pub timeout_secs: u64,
    pub max_pages: Option<usize>,
    /// Also keep redirect targets on the seed's domain
    pub scope_redirects: bool,
    /// JSON Lines destination; stdout when unset
    pub output: Option<PathBuf>,
    pub show_progress: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            workers: 10,
            timeout_secs: 10,
            max_pages: None,
            scope_redirects: false,
            output: None,
            show_progress: true,
        }
    }
}

/// Everything the final report needs once a crawl has finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub start_url: String,
    pub scope_domain: String,
    pub pages: usize,
    pub dropped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub started_at: String,
    pub finished_at: String,
    pub audit: CrawlAudit,
}

impl CrawlSummary {
    fn from_outcome(outcome: CrawlOutcome, output: Option<PathBuf>, started_at: String) -> Self {
        Self {
            start_url: outcome.seed.start_url().to_string(),
            scope_domain: outcome.seed.scope_domain().to_string(),
            pages: outcome.pages,
            dropped: outcome.dropped,
            output,
            started_at,
            finished_at: now_rfc3339(),
            audit: outcome.audit,
        }
    }
}

/// Execute a crawl with the given options, streaming page records as JSON Lines.
pub async fn execute_crawl(options: CrawlOptions) -> Result<CrawlSummary> {
    // Validate the seed before touching the output file
    let seed = SeedSpec::new(&options.url)?;

    let listener = Arc::new(if options.show_progress {
        ProgressListener::new()
    } else {
        ProgressListener::hidden()
    });

    let crawler = Crawler::with_timeout(options.timeout_secs)?
        .with_workers(options.workers)
        .with_max_pages(options.max_pages)
        .with_redirect_scope(options.scope_redirects)
        .with_listener(listener);

    let started_at = now_rfc3339();
    let start_url = seed.start_url().as_str();

    let outcome = match options.output {
        Some(ref path) => {
            info!("Writing page records to {}", path.display());
            let mut sink = JsonLinesSink::new(BufWriter::new(File::create(path)?));
            crawler.crawl(start_url, &mut sink).await?
        }
        None => {
            let mut sink = JsonLinesSink::new(BufWriter::new(io::stdout()));
            crawler.crawl(start_url, &mut sink).await?
        }
    };

    Ok(CrawlSummary::from_outcome(outcome, options.output, started_at))
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
