pub mod bootstrap;
pub mod classify;
pub mod crawler;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod listener;
pub mod normalize;
pub mod result;
pub mod sink;

pub use classify::ContentKind;
pub use crawler::{CrawlOutcome, Crawler};
pub use engine::{Discovery, DiscoveryEngine};
pub use error::{Rejected, ScanError};
pub use frontier::Frontier;
pub use listener::{CrawlListener, NoopListener};
pub use normalize::{NormalizedUrl, SeedSpec};
pub use result::{
    CrawlAudit, ErrorObservation, FetchRequest, FetchResponse, Headers, IframeObservation,
    PageRecord,
};
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
