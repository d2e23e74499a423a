// Tests for audit report generation

use caliper_core::crawl::CrawlSummary;
use caliper_core::report::{
    ReportFormat, generate_json_report, generate_report, generate_text_report, save_report,
};
use caliper_scanner::{CrawlAudit, FetchRequest, FetchResponse, Headers, NormalizedUrl, SeedSpec};
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

fn page(url: &NormalizedUrl, referrer: Option<NormalizedUrl>, status: u16) -> FetchResponse {
    let request = FetchRequest::new(url.clone(), referrer);
    FetchResponse::new(&request, status, Headers::default(), Vec::new())
}

fn summary_with(audit: CrawlAudit) -> CrawlSummary {
    CrawlSummary {
        start_url: "https://cdh.princeton.edu/".to_string(),
        scope_domain: "cdh.princeton.edu".to_string(),
        pages: 42,
        dropped: 0,
        output: None,
        started_at: "2024-05-01T12:00:00Z".to_string(),
        finished_at: "2024-05-01T12:03:00Z".to_string(),
        audit,
    }
}

fn populated_audit() -> CrawlAudit {
    let seed = SeedSpec::new("https://cdh.princeton.edu/").unwrap();
    let home = seed.start_url().clone();
    let missing = seed.robots_url();

    let mut audit = CrawlAudit::new();
    audit.record_iframe(&home, "https://www.youtube.com/embed/abc");
    audit.record_error(&page(&missing, Some(home.clone()), 404));
    audit.record_error(&page(&home, None, 500));
    audit
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("txt"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("csv"), None);
    assert_eq!(ReportFormat::from_str(""), None);
}

// ============================================================================
// Text Report Tests
// ============================================================================

#[test]
fn test_text_report_lists_iframes_and_errors() {
    let report = generate_text_report(&summary_with(populated_audit()));

    assert!(report.contains("Pages recorded: 42"));
    assert!(report.contains("Iframes found: 1"));
    assert!(report.contains("Error pages: 2"));

    assert!(report.contains("Iframes: (source url, iframe url)"));
    assert!(report.contains("https://cdh.princeton.edu/\thttps://www.youtube.com/embed/abc\n"));

    assert!(report.contains("Errors: (error url, status code, referrer)"));
    assert!(report.contains(
        "https://cdh.princeton.edu/robots.txt\t404\thttps://cdh.princeton.edu/\n"
    ));
    // No referrer renders as an empty trailing column
    assert!(report.contains("https://cdh.princeton.edu/\t500\t\n"));
}

#[test]
fn test_text_report_errors_keep_discovery_order() {
    let report = generate_text_report(&summary_with(populated_audit()));
    let first = report.find("\t404\t").unwrap();
    let second = report.find("\t500\t").unwrap();
    assert!(first < second);
}

#[test]
fn test_text_report_omits_empty_sections() {
    let report = generate_text_report(&summary_with(CrawlAudit::new()));

    assert!(report.contains("Iframes found: 0"));
    assert!(!report.contains("Iframes: (source url"));
    assert!(!report.contains("Errors: (error url"));
    assert!(!report.contains("Requests dropped"));
}

#[test]
fn test_text_report_mentions_output_and_drops() {
    let mut summary = summary_with(CrawlAudit::new());
    summary.output = Some(PathBuf::from("/tmp/cdh-crawl.jl"));
    summary.dropped = 3;

    let report = generate_text_report(&summary);
    assert!(report.contains("Records written to: /tmp/cdh-crawl.jl"));
    assert!(report.contains("Requests dropped: 3"));
}

// ============================================================================
// JSON Report Tests
// ============================================================================

#[test]
fn test_json_report_structure() {
    let json = generate_json_report(&summary_with(populated_audit())).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let report = &value["report"];

    assert_eq!(report["metadata"]["generator"], "Caliper");
    assert_eq!(report["crawl"]["scope_domain"], "cdh.princeton.edu");
    assert_eq!(report["summary"]["pages_recorded"], 42);
    assert_eq!(report["summary"]["error_pages"], 2);

    assert_eq!(report["iframes"][0]["iframe_url"], "https://www.youtube.com/embed/abc");
    assert_eq!(report["errors"][0]["status_code"], 404);
    assert_eq!(report["errors"][1]["referrer"], serde_json::Value::Null);
}

#[test]
fn test_generate_report_dispatches_on_format() {
    let summary = summary_with(populated_audit());
    let text = generate_report(&summary, ReportFormat::Text).unwrap();
    let json = generate_report(&summary, ReportFormat::Json).unwrap();

    assert!(text.starts_with("━"));
    assert!(json.trim_start().starts_with('{'));
}

// ============================================================================
// Save Report Tests
// ============================================================================

#[test]
fn test_save_report() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("audit.txt");

    let content = generate_text_report(&summary_with(populated_audit()));
    save_report(&content, &path)?;

    assert_eq!(std::fs::read_to_string(&path)?, content);
    Ok(())
}
