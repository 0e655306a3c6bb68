//! HTML parser for extracting links and visible text
//!
//! This module handles parsing fetched markup to extract:
//! - Links to follow (from `<a>` tags and `<link rel="alternate">` locale variants)
//! - The visible text of a page region, used for content fingerprinting

use crate::url::{canonicalize, HostFilter};
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::debug;
use url::Url;

/// Links found on a page, split by whether the crawl should follow them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    /// Canonical same-site document links
    pub keep: BTreeSet<String>,

    /// Canonical links rejected by host, pattern or file type
    pub discard: BTreeSet<String>,
}

/// Extracts and classifies the outbound links of a page
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    filter: HostFilter,
}

impl LinkExtractor {
    pub fn new(filter: HostFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &HostFilter {
        &self.filter
    }

    /// Extracts links from markup and partitions them into keep and discard
    ///
    /// # Link Extraction Rules
    ///
    /// **Include:**
    /// - `<a href="...">` anywhere in the document
    /// - `<link rel="alternate" href="...">` (locale variants of the page)
    ///
    /// **Exclude before classification:**
    /// - `javascript:`, `tel:` and `data:` links
    /// - Fragment-only links (same page anchors)
    /// - Links that fail to resolve against the base URL
    ///
    /// Every remaining link is canonicalized, then kept only if the host filter allows it
    /// and it does not point at a non-document file. An unparseable base URL yields no links.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The final URL of the page, used to resolve relative links
    /// * `markup` - The page's raw HTML
    pub fn extract(&self, base_url: &str, markup: &str) -> ExtractedLinks {
        let mut links = ExtractedLinks::default();

        let Ok(base) = Url::parse(base_url) else {
            return links;
        };

        for candidate in collect_hrefs(markup, &base) {
            let Ok(canonical) = canonicalize(&candidate) else {
                continue;
            };

            if !self.filter.is_allowed(&canonical) {
                debug!("Discarding link {}", canonical);
                links.discard.insert(canonical);
            } else if !self.filter.is_downloadable(&canonical) {
                debug!("Unsupported filetype of URL: {}", canonical);
                links.discard.insert(canonical);
            } else {
                links.keep.insert(canonical);
            }
        }

        // A link seen both ways is kept
        links.discard.retain(|url| !links.keep.contains(url));
        links
    }
}

/// Collects resolved hrefs of anchors and alternate links
fn collect_hrefs(markup: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(markup);
    let mut hrefs = Vec::new();

    for selector in ["a[href]", "link[rel~=\"alternate\"][href]"] {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    hrefs.push(absolute_url);
                }
            }
        }
    }

    hrefs
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, tel: schemes
/// - data: URIs
/// - Fragment-only and empty hrefs
/// - Invalid URLs
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    base_url.join(href).ok().map(|url| url.to_string())
}

/// Returns the text of the first element matching `selector`
///
/// # Returns
///
/// * `Some(String)` - Concatenated text nodes of the first match (empty if it has none)
/// * `None` - The selector is invalid or nothing matches
pub fn visible_text(markup: &str, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let document = Html::parse_document(markup);

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
}
