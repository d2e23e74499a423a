use crate::error::{Result, ScanError};
use scraper::{ElementRef, Html, Selector};

/// Raw URLs pulled out of one HTML document, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Outbound candidates: anchors, then link hrefs, then scripts, then images.
    pub candidates: Vec<String>,
    /// Iframe sources; audited, never fetched.
    pub iframes: Vec<String>,
    /// `<base href>` if the document declares one.
    pub base_href: Option<String>,
}

/// Extract candidate URLs from an HTML page.
pub fn extract_links(html: &str) -> Result<Extraction> {
    let document = Html::parse_document(html);
    let mut extraction = Extraction {
        base_href: first_attr(&document, "base[href]", "href")?,
        ..Extraction::default()
    };

    // Page links, minus mail and script pseudo-links
    for href in attr_values(&document, "a[href]", "href")? {
        if href.starts_with("mailto:") || href.starts_with("javascript:") {
            continue;
        }
        extraction.candidates.push(href);
    }

    // Stylesheets, icons and other header links
    extraction
        .candidates
        .extend(attr_values(&document, "link[href]", "href")?);

    extraction
        .candidates
        .extend(attr_values(&document, "script[src]", "src")?);

    // Images: responsive variants first, then the plain source
    let img_selector = selector("img")?;
    for img in document.select(&img_selector) {
        let srcset =
            non_empty_attr(&img, "srcset").or_else(|| non_empty_attr(&img, "data-srcset"));
        if let Some(srcset) = srcset {
            extraction.candidates.extend(srcset_urls(srcset));
        }
        let src = non_empty_attr(&img, "src").or_else(|| non_empty_attr(&img, "data-src"));
        if let Some(src) = src {
            extraction.candidates.push(src.to_string());
        }
    }

    extraction.iframes = attr_values(&document, "iframe[src]", "src")?;

    Ok(extraction)
}

/// URLs from a `srcset` value, with width/density descriptors dropped.
pub fn srcset_urls(srcset: &str) -> Vec<String> {
    srcset
        .split(',')
        .filter_map(|part| part.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScanError::ParseError(format!("selector {}: {:?}", css, e)))
}

fn attr_values(document: &Html, css: &str, attr: &str) -> Result<Vec<String>> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::to_string)
        .collect())
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Result<Option<String>> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .find_map(|element| non_empty_attr(&element, attr))
        .map(str::to_string))
}

fn non_empty_attr<'a>(element: &ElementRef<'a>, attr: &str) -> Option<&'a str> {
    element.value().attr(attr).filter(|value| !value.is_empty())
}
