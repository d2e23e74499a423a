use anyhow::{Context, Result, anyhow};
use caliper_core::crawl::{CrawlOptions, CrawlSummary, execute_crawl};
use caliper_core::report::{ReportFormat, generate_report, save_report};
use clap::ArgMatches;
use colored::Colorize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Install the stderr log subscriber. `RUST_LOG` overrides the `warn` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second install (tests, embedding) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Build crawl options from the `crawl` subcommand's arguments
pub fn crawl_options_from_args(args: &ArgMatches) -> Result<CrawlOptions> {
    let url = args
        .get_one::<Url>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;

    let mut options = CrawlOptions::new(url.as_str());
    options.workers = args.get_one::<usize>("threads").copied().unwrap_or(10);
    options.timeout_secs = args.get_one::<u64>("timeout").copied().unwrap_or(10);
    options.max_pages = args.get_one::<usize>("max-pages").copied();
    options.scope_redirects = args.get_flag("scope-redirects");
    options.show_progress = !args.get_flag("no-progress");
    options.output = args.get_one::<String>("output").map(|raw| expand_path(raw));

    if options.workers == 0 {
        return Err(anyhow!("--threads must be at least 1"));
    }

    Ok(options)
}

/// Render the audit report; returns it for printing unless it was saved to `destination`
pub fn render_report(
    summary: &CrawlSummary,
    format: ReportFormat,
    destination: Option<&Path>,
) -> Result<Option<String>> {
    let content = generate_report(summary, format).context("Failed to serialize report")?;

    match destination {
        Some(path) => {
            save_report(&content, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            Ok(None)
        }
        None => Ok(Some(content)),
    }
}

/// Write a rendered report without mixing it into the page records.
///
/// When records stream to stdout the report goes to stderr instead.
pub fn emit_report(
    report: &str,
    records_on_stdout: bool,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> io::Result<()> {
    if records_on_stdout {
        stderr.write_all(report.as_bytes())?;
        stderr.flush()
    } else {
        stdout.write_all(report.as_bytes())?;
        stdout.flush()
    }
}

fn print_divider() {
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    init_tracing();

    let options = match crawl_options_from_args(sub_matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let report_path = sub_matches.get_one::<String>("report").map(|raw| expand_path(raw));
    debug!(?options, "crawl options parsed");

    // Print crawl configuration
    if !quiet {
        print_divider();
        eprintln!("{} Crawling {}", "→".blue(), options.url.bright_white());
        eprintln!("  Workers: {}", options.workers);
        eprintln!("  Timeout: {}s", options.timeout_secs);
        if let Some(max_pages) = options.max_pages {
            eprintln!("  Max pages: {}", max_pages);
        }
        let redirects = if options.scope_redirects {
            "same domain only"
        } else {
            "followed anywhere"
        };
        eprintln!("  Redirects: {}", redirects);
        match options.output {
            Some(ref path) => eprintln!("  Records: {}", path.display()),
            None => eprintln!("  Records: stdout"),
        }
        print_divider();
    }

    let records_on_stdout = options.output.is_none();
    let summary = match execute_crawl(options).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        eprintln!(
            "\n{} Crawl complete! {} pages recorded\n",
            "✓".green().bold(),
            summary.pages
        );
    }

    match render_report(&summary, format, report_path.as_deref()) {
        Ok(Some(report)) => {
            let written =
                emit_report(&report, records_on_stdout, &mut io::stdout(), &mut io::stderr());
            if let Err(e) = written {
                eprintln!("{} Failed to print report: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        }
        Ok(None) => {
            if let Some(path) = report_path {
                eprintln!("{} Report saved to {}", "✓".green().bold(), path.display());
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}
