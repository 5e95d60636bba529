//! HTML link extraction
//!
//! The domain crawler sees pages only through the `LinkExtractor` seam;
//! `HtmlLinkExtractor` is the production implementation built on `scraper`.

use scraper::{Html, Selector};
use url::Url;

/// Turns a fetched page body into candidate links
pub trait LinkExtractor: Send + Sync {
    /// Returns absolute URLs found in `body`, resolved against `base_url`
    ///
    /// An `Err` is recorded by the crawler as a page-level parse error.
    fn extract_links(&self, body: &str, base_url: &Url) -> Result<Vec<String>, String>;
}

/// Extracts links from HTML documents
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<link rel="stylesheet" ...>`, `<script src="...">`, `<img src="...">`
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links
/// - Anything that is not HTTP(S) after resolution
///
/// `rel="nofollow"` links are followed.
///
/// # Example
///
/// ```no_run
/// use shelf_scout::crawler::{HtmlLinkExtractor, LinkExtractor};
/// use url::Url;
///
/// let html = r#"<html><body><a href="/p/12345678">Item</a></body></html>"#;
/// let base_url = Url::parse("https://shop.example/").unwrap();
/// let links = HtmlLinkExtractor.extract_links(html, &base_url).unwrap();
/// assert_eq!(links, vec!["https://shop.example/p/12345678".to_string()]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, body: &str, base_url: &Url) -> Result<Vec<String>, String> {
        let document = Html::parse_document(body);
        Ok(collect_links(&document, base_url))
    }
}

fn collect_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute HTTP(S) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
