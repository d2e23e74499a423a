// Final audit report, produced after the crawl has drained

use crate::crawl::CrawlSummary;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn generate_report(
    summary: &CrawlSummary,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(summary)),
        ReportFormat::Json => generate_json_report(summary),
    }
}

/// Summary followed by the iframe and error listings, tab separated.
///
/// Listings with nothing in them are left out entirely.
pub fn generate_text_report(summary: &CrawlSummary) -> String {
    let audit = &summary.audit;
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("\n\n# Summary:\n");
    report.push_str(&format!("  Start URL: {}\n", summary.start_url));
    report.push_str(&format!("  Scope: {}\n", summary.scope_domain));
    report.push_str(&format!("  Pages recorded: {}\n", summary.pages));
    if summary.dropped > 0 {
        report.push_str(&format!("  Requests dropped: {}\n", summary.dropped));
    }
    report.push_str(&format!("  Iframes found: {}\n", audit.iframes().len()));
    report.push_str(&format!("  Error pages: {}\n", audit.errors().len()));
    if let Some(ref output) = summary.output {
        report.push_str(&format!("  Records written to: {}\n", output.display()));
    }

    if !audit.iframes().is_empty() {
        report.push_str("\nIframes: (source url, iframe url)\n");
        for iframe in audit.iframes() {
            report.push_str(&format!("{}\t{}\n", iframe.source_url, iframe.iframe_url));
        }
    }

    if !audit.errors().is_empty() {
        report.push_str("\nErrors: (error url, status code, referrer)\n");
        for error in audit.errors() {
            report.push_str(&format!(
                "{}\t{}\t{}\n",
                error.url,
                error.status_code,
                error.referrer.as_deref().unwrap_or_default()
            ));
        }
    }

    report.push('\n');
    report.push_str(RULE);
    report.push('\n');
    report
}

pub fn generate_json_report(summary: &CrawlSummary) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Caliper",
                "version": env!("CARGO_PKG_VERSION"),
                "format": "json"
            },
            "crawl": {
                "start_url": summary.start_url,
                "scope_domain": summary.scope_domain,
                "started_at": summary.started_at,
                "finished_at": summary.finished_at,
                "output": summary.output
            },
            "summary": {
                "pages_recorded": summary.pages,
                "requests_dropped": summary.dropped,
                "iframes": summary.audit.iframes().len(),
                "error_pages": summary.audit.errors().len()
            },
            "iframes": summary.audit.iframes(),
            "errors": summary.audit.errors()
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
