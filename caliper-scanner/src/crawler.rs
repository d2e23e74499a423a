use crate::engine::DiscoveryEngine;
use crate::error::{Result, ScanError};
use crate::fetch::Fetcher;
use crate::frontier::Frontier;
use crate::listener::{CrawlListener, NoopListener};
use crate::normalize::SeedSpec;
use crate::result::{CrawlAudit, FetchRequest, FetchResponse};
use crate::sink::RecordSink;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Idle workers poll the frontier at this interval.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// What a finished crawl leaves behind once its records have gone to the sink.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub seed: SeedSpec,
    pub pages: usize,
    pub dropped: usize,
    pub audit: CrawlAudit,
}

enum FetchEvent {
    Fetched(FetchResponse),
    Failed { request: FetchRequest, error: ScanError },
}

pub struct Crawler {
    fetcher: Fetcher,
    workers: usize,
    max_pages: Option<usize>,
    scope_redirects: bool,
    listener: Arc<dyn CrawlListener>,
}

impl Crawler {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(timeout_secs)?,
            workers: 10,
            max_pages: None,
            scope_redirects: false,
            listener: Arc::new(NoopListener),
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Stop after this many records; everything still queued is dropped.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages.filter(|&max| max > 0);
        self
    }

    pub fn with_redirect_scope(mut self, enabled: bool) -> Self {
        self.scope_redirects = enabled;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn CrawlListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Crawl every in-scope page reachable from `start_url`, writing one record
    /// per response to `sink` in the order responses are processed.
    pub async fn crawl(
        &self,
        start_url: &str,
        sink: &mut (dyn RecordSink + Send),
    ) -> Result<CrawlOutcome> {
        let seed = SeedSpec::new(start_url)?;
        info!(
            "Starting crawl of {} (scope {}) with {} workers",
            seed.start_url(),
            seed.scope_domain(),
            self.workers
        );

        let frontier = Arc::new(Frontier::new());
        let mut engine = DiscoveryEngine::new(seed.clone(), frontier.clone(), self.listener.clone())
            .with_redirect_scope(self.scope_redirects);
        engine.start();

        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let worker_handles: Vec<_> = (0..self.workers)
            .map(|worker_id| {
                let fetcher = self.fetcher.clone();
                let frontier = frontier.clone();
                let shutdown = shutdown.clone();
                let tx = tx.clone();

                tokio::spawn(async move {
                    debug!("Worker {} started", worker_id);
                    while !shutdown.load(Ordering::SeqCst) {
                        let Some(request) = frontier.next() else {
                            tokio::time::sleep(IDLE_POLL).await;
                            continue;
                        };

                        let event = match fetcher.fetch(&request).await {
                            Ok(response) => FetchEvent::Fetched(response),
                            Err(error) => FetchEvent::Failed { request, error },
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    debug!("Worker {} finished", worker_id);
                })
            })
            .collect();
        drop(tx);

        let driven = self
            .drive(&mut engine, &frontier, &shutdown, &mut rx, sink)
            .await;

        // Workers only exit once told to, whether the crawl drained or failed
        shutdown.store(true, Ordering::SeqCst);
        for joined in join_all(worker_handles).await {
            joined?;
        }

        let (pages, dropped) = driven?;
        sink.flush()?;

        let audit = engine.finish();
        info!(
            "Crawl complete. Recorded {} pages ({} iframes, {} error pages)",
            pages,
            audit.iframes().len(),
            audit.errors().len()
        );

        Ok(CrawlOutcome {
            seed,
            pages,
            dropped,
            audit,
        })
    }

    /// Feed completed fetches through the engine until the frontier drains.
    async fn drive(
        &self,
        engine: &mut DiscoveryEngine,
        frontier: &Frontier,
        shutdown: &AtomicBool,
        rx: &mut mpsc::UnboundedReceiver<FetchEvent>,
        sink: &mut (dyn RecordSink + Send),
    ) -> Result<(usize, usize)> {
        let mut pages = 0;
        let mut dropped = 0;
        let mut stopping = false;

        while !frontier.is_drained() {
            let Some(event) = rx.recv().await else {
                break;
            };

            match event {
                FetchEvent::Fetched(response) if stopping => {
                    let request = FetchRequest::new(response.url, response.referrer);
                    engine.drop_request(&request);
                    dropped += 1;
                }
                FetchEvent::Fetched(response) => {
                    let discovery = engine.process(&response);
                    sink.write_record(&discovery.record)?;
                    pages += 1;

                    if self.max_pages.is_some_and(|max| pages >= max) {
                        info!("Page limit of {} reached, dropping remaining requests", pages);
                        stopping = true;
                        shutdown.store(true, Ordering::SeqCst);
                        for request in frontier.discard_pending() {
                            engine.drop_request(&request);
                            dropped += 1;
                        }
                    }
                }
                FetchEvent::Failed { request, error } => {
                    warn!("Crawl error for {}: {}", request.url, error);
                    engine.drop_request(&request);
                    dropped += 1;
                }
            }

            frontier.complete();
        }

        Ok((pages, dropped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::PageRecord;
    use crate::sink::MemorySink;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[derive(Default)]
    struct CountingListener {
        queued: AtomicUsize,
        dropped: AtomicUsize,
        recorded: AtomicUsize,
        finished: AtomicBool,
    }

    impl CrawlListener for CountingListener {
        fn on_queued(&self, _request: &FetchRequest) {
            self.queued.fetch_add(1, Ordering::SeqCst);
        }
        fn on_dropped(&self, _request: &FetchRequest) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
        fn on_recorded(&self, _record: &PageRecord) {
            self.recorded.fetch_add(1, Ordering::SeqCst);
        }
        fn on_finished(&self, _audit: &CrawlAudit) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    async fn mount_html(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_bytes(body.into_bytes()),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn recorded_urls(sink: &MemorySink) -> HashSet<String> {
        sink.records.iter().map(|r| r.url.clone()).collect()
    }

    /// Full discovery pass: links, robots.txt, sitemap, redirect, error page, iframe
    #[tokio::test]
    async fn test_crawl_discovers_whole_site() {
        let server = MockServer::start().await;
        let base = server.uri();

        mount_html(
            &server,
            "/",
            format!(
                r#"<html><head><link rel="stylesheet" href="/style.css"></head><body>
                    <a href="/about">About</a>
                    <a href="{base}/old">Old</a>
                    <a href="https://offsite.invalid/page">Elsewhere</a>
                    <a href="mailto:team@x.com">Mail</a>
                    <img srcset="/img-1x.png 1x, /img-2x.png 2x">
                    <iframe src="https://www.youtube.com/embed/xyz"></iframe>
                </body></html>"#
            ),
        )
        .await;
        mount_html(
            &server,
            "/about",
            r#"<a href="/">Home</a><a href="/about#team">Team</a>"#.to_string(),
        )
        .await;
        mount_html(&server, "/from-sitemap", "<p>listed only in the sitemap</p>".to_string()).await;
        mount_html(&server, "/new", "<p>moved here</p>".to_string()).await;

        for asset in ["/style.css", "/img-1x.png", "/img-2x.png"] {
            Mock::given(method("GET"))
                .and(path(asset))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"asset".to_vec()))
                .expect(1)
                .mount(&server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string(format!(
                        "User-agent: *\nDisallow: /\nSitemap: {base}/sitemap.xml\n"
                    )),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/xml")
                    .set_body_string(format!(
                        "<urlset><url><loc>{base}/from-sitemap</loc></url>\
                         <url><loc>{base}/missing</loc></url></urlset>"
                    )),
            )
            .expect(1)
            .mount(&server)
            .await;

        // Anything unmounted (here /missing) gets wiremock's default 404

        let listener = Arc::new(CountingListener::default());
        let crawler = Crawler::new()
            .unwrap()
            .with_workers(4)
            .with_listener(listener.clone());

        let mut sink = MemorySink::new();
        let outcome = crawler.crawl(&base, &mut sink).await.unwrap();

        let expected: HashSet<String> = [
            "/", "/robots.txt", "/about", "/old", "/new", "/style.css", "/img-1x.png",
            "/img-2x.png", "/sitemap.xml", "/from-sitemap", "/missing",
        ]
        .iter()
        .map(|p| format!("{}{}", base, p))
        .collect();

        assert_eq!(recorded_urls(&sink), expected);
        assert_eq!(sink.records.len(), expected.len(), "a URL was fetched twice");
        assert_eq!(outcome.pages, expected.len());

        let audit = &outcome.audit;
        assert_eq!(audit.iframes().len(), 1);
        assert_eq!(audit.iframes()[0].source_url, format!("{}/", base));
        assert_eq!(audit.iframes()[0].iframe_url, "https://www.youtube.com/embed/xyz");

        assert_eq!(audit.errors().len(), 1);
        assert_eq!(audit.errors()[0].url, format!("{}/missing", base));
        assert_eq!(audit.errors()[0].status_code, 404);
        assert_eq!(
            audit.errors()[0].referrer.as_deref(),
            Some(format!("{}/sitemap.xml", base).as_str())
        );

        let redirect = sink.records.iter().find(|r| r.url.ends_with("/new")).unwrap();
        assert_eq!(redirect.referrer.as_deref(), Some(format!("{}/old", base).as_str()));

        assert_eq!(listener.recorded.load(Ordering::SeqCst), expected.len());
        assert_eq!(listener.queued.load(Ordering::SeqCst), expected.len());
        assert_eq!(listener.dropped.load(Ordering::SeqCst), 0);
        assert!(listener.finished.load(Ordering::SeqCst));
    }

    /// Pages that all link to each other are still fetched exactly once
    #[tokio::test]
    async fn test_densely_linked_pages_fetched_once() {
        let server = MockServer::start().await;

        let mut nav = String::from("<nav>");
        for i in 0..12 {
            nav.push_str(&format!(r#"<a href="/page{}">Page {}</a>"#, i, i));
            nav.push_str(&format!(r#"<a href="{}/page{}#top">Top</a>"#, server.uri(), i));
        }
        nav.push_str("</nav>");

        mount_html(&server, "/", nav.clone()).await;
        for i in 0..12 {
            mount_html(&server, &format!("/page{}", i), nav.clone()).await;
        }

        let crawler = Crawler::new().unwrap().with_workers(8);
        let mut sink = MemorySink::new();
        let outcome = crawler.crawl(&server.uri(), &mut sink).await.unwrap();

        // 13 pages plus the (404) robots.txt
        assert_eq!(outcome.pages, 14);
        assert_eq!(recorded_urls(&sink).len(), 14);
        assert_eq!(outcome.audit.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_max_pages_drops_remaining_work() {
        let server = MockServer::start().await;

        let mut links = String::new();
        for i in 0..20 {
            links.push_str(&format!(r#"<a href="/p{}">{}</a>"#, i, i));
        }
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(links),
            )
            .mount(&server)
            .await;

        let listener = Arc::new(CountingListener::default());
        let crawler = Crawler::new()
            .unwrap()
            .with_workers(1)
            .with_max_pages(Some(3))
            .with_listener(listener.clone());

        let mut sink = MemorySink::new();
        let outcome = crawler.crawl(&server.uri(), &mut sink).await.unwrap();

        assert_eq!(outcome.pages, 3);
        assert_eq!(sink.records.len(), 3);

        let queued = listener.queued.load(Ordering::SeqCst);
        let dropped = listener.dropped.load(Ordering::SeqCst);
        let recorded = listener.recorded.load(Ordering::SeqCst);
        assert!(dropped > 0);
        assert_eq!(dropped, outcome.dropped);
        assert_eq!(queued, recorded + dropped, "every queued request must be settled");
    }

    #[tokio::test]
    async fn test_transport_failures_are_dropped_not_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<p>home</p>"),
            )
            .mount(&server)
            .await;

        // Sitemap entries skip the scope filter, so an unreachable host gets queued
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("Sitemap: {}/sitemap.xml", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/xml")
                    .set_body_string(
                        "<urlset><url><loc>http://127.0.0.1:1/unreachable</loc></url></urlset>",
                    ),
            )
            .mount(&server)
            .await;

        let listener = Arc::new(CountingListener::default());
        let crawler = Crawler::with_timeout(2)
            .unwrap()
            .with_workers(2)
            .with_listener(listener.clone());

        let mut sink = MemorySink::new();
        let outcome = crawler.crawl(&server.uri(), &mut sink).await.unwrap();

        assert_eq!(outcome.pages, 3);
        assert_eq!(outcome.dropped, 1);
        assert_eq!(listener.dropped.load(Ordering::SeqCst), 1);
        assert!(!recorded_urls(&sink).contains("http://127.0.0.1:1/unreachable"));
    }

    #[tokio::test]
    async fn test_invalid_seed_is_rejected() {
        let crawler = Crawler::new().unwrap();
        let mut sink = MemorySink::new();
        let result = crawler.crawl("not a url", &mut sink).await;
        assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
        assert!(sink.records.is_empty());
    }
}
