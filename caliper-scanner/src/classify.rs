use crate::result::FetchResponse;

/// Extraction strategy chosen for a fetched response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    RobotsText,
    XmlSitemap,
    Other,
}

/// Media types accepted for sitemaps; `text/xml` is common in the wild.
const SITEMAP_MEDIA_TYPES: [&str; 2] = ["application/xml", "text/xml"];

pub fn classify(response: &FetchResponse) -> ContentKind {
    // robots.txt is recognised by path, whatever it is served as
    if response.url.as_url().path().ends_with("/robots.txt") {
        return ContentKind::RobotsText;
    }

    let Some(media_type) = response.headers.media_type() else {
        return ContentKind::Other;
    };

    if media_type.starts_with("text/html") {
        ContentKind::Html
    } else if SITEMAP_MEDIA_TYPES.contains(&media_type.as_str())
        && response.url.as_str().contains("sitemap")
    {
        ContentKind::XmlSitemap
    } else {
        ContentKind::Other
    }
}
