pub mod crawl;
pub mod progress;
pub mod report;

pub use crawl::{CrawlOptions, CrawlSummary, execute_crawl};
pub use progress::ProgressListener;
pub use report::{ReportFormat, generate_report};

const BANNER: &str = r#"
   ___      _ _
  / __\__ _| (_)_ __   ___ _ __
 / /  / _` | | | '_ \ / _ \ '__|
/ /__| (_| | | | |_) |  __/ |
\____/\__,_|_|_| .__/ \___|_|
               |_|
"#;

pub fn banner() -> String {
    format!("{}  v{} - measure every page of a site\n", BANNER, env!("CARGO_PKG_VERSION"))
}

pub fn print_banner() {
    eprintln!("{}", banner());
}
