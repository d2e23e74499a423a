// Seed discovery from robots.txt and XML sitemaps

use crate::error::{Result, ScanError};
use crate::normalize::SeedSpec;
use crate::result::FetchRequest;
use quick_xml::Reader;
use quick_xml::events::Event;

const SITEMAP_DIRECTIVE: &str = "sitemap:";

/// The two requests every crawl starts with: the seed page and its robots.txt.
///
/// robots.txt is always fetched, only to mine it for sitemap hints; its
/// exclusion rules are not honoured.
pub fn seed_requests(seed: &SeedSpec) -> [FetchRequest; 2] {
    [
        FetchRequest::new(seed.start_url().clone(), None),
        FetchRequest::new(seed.robots_url(), None),
    ]
}

/// Sitemap URLs declared in a robots.txt body, one per `Sitemap:` line.
pub fn sitemaps_from_robots(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter_map(|line| {
            let head = line.get(..SITEMAP_DIRECTIVE.len())?;
            if !head.eq_ignore_ascii_case(SITEMAP_DIRECTIVE) {
                return None;
            }
            let value = line[SITEMAP_DIRECTIVE.len()..].trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect()
}

/// Every `<loc>` in a sitemap or sitemap index document.
///
/// On malformed XML the error carries no partial results; use
/// [`locations_from_sitemap_lossy`] to keep what was read before the fault.
pub fn locations_from_sitemap(body: &str) -> Result<Vec<String>> {
    let mut locations = Vec::new();
    read_locations(body, &mut locations)?;
    Ok(locations)
}

/// Like [`locations_from_sitemap`], but returns the locations read before a
/// parse failure alongside the error.
pub fn locations_from_sitemap_lossy(body: &str) -> (Vec<String>, Option<ScanError>) {
    let mut locations = Vec::new();
    let error = read_locations(body, &mut locations).err();
    (locations, error)
}

fn read_locations(body: &str, locations: &mut Vec<String>) -> Result<()> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut in_loc = false;
    let mut current = String::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            ScanError::ParseError(format!(
                "sitemap XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(tag) if tag.local_name().as_ref() == b"loc" => {
                in_loc = true;
                current.clear();
            }
            Event::Text(text) if in_loc => {
                let text = text
                    .unescape()
                    .map_err(|e| ScanError::ParseError(format!("sitemap <loc>: {}", e)))?;
                current.push_str(&text);
            }
            Event::CData(data) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&data.into_inner()));
            }
            Event::End(tag) if tag.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let location = current.trim();
                if !location.is_empty() {
                    locations.push(location.to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(())
}
