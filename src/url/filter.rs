use crate::url::domain::{registrable_domain, registrable_domain_str};
use std::collections::BTreeSet;
use url::Url;

/// File extensions that never hold a crawlable document
const FORBIDDEN_EXTENSIONS: &[&str] = &[
    // Office documents and PDFs
    "pdf", "ppt", "pptx", "xls", "xlsx", "doc", "docx", "ods", "odt", "odf", "odp", "rtf", "wpd",
    "key", "csv",
    // Web assets
    "css", "rss", "js", "wsdl", "xsd",
    // Images
    "jpeg", "jpg", "gif", "webp", "tiff", "tif", "png", "bmp", "ico", "psd", "svg", "ai", "ps",
    // Audio
    "mp3", "ogg", "wav", "aif", "cda", "mid", "midi", "wma", "wpl",
    // Video
    "webm", "mp4", "3g2", "3gp", "mkv", "avi", "flv", "h264", "m4v", "mov", "mpg", "mpeg", "rm",
    "swf", "vob", "wmv",
    // Archives and packages
    "7z", "arj", "zip", "gz", "gzip", "tar", "rar", "pkg", "deb", "rpm", "z", "bin", "dmg", "iso",
    "toast", "vcd",
    // Data and databases
    "dat", "db", "dbf", "sql", "sav", "mdb", "scr",
    // Fonts
    "ttf", "otf", "fon", "fnt",
];

/// Decides whether a URL belongs to the crawl
///
/// A URL is allowed when it is not a `mailto:` link, its registrable domain is one of
/// the valid hosts, and it contains at least one of the required patterns. The empty
/// pattern matches everything.
#[derive(Debug, Clone)]
pub struct HostFilter {
    valid_hosts: BTreeSet<String>,
    patterns: Vec<String>,
}

impl HostFilter {
    /// Creates a filter from pre-computed registrable domains and patterns
    pub fn new(valid_hosts: BTreeSet<String>, patterns: Vec<String>) -> Self {
        Self {
            valid_hosts,
            patterns,
        }
    }

    /// Derives the valid host set from a list of seed URLs
    ///
    /// Seeds whose domain cannot be determined contribute nothing.
    pub fn hosts_from_seeds<S: AsRef<str>>(seeds: &[S]) -> BTreeSet<String> {
        seeds
            .iter()
            .filter_map(|seed| registrable_domain_str(seed.as_ref()))
            .collect()
    }

    /// Returns true if the URL is on an allowed domain and matches a pattern
    pub fn is_allowed(&self, url: &str) -> bool {
        if url.trim_start().to_ascii_lowercase().starts_with("mailto:") {
            return false;
        }

        let Ok(parsed) = Url::parse(url) else {
            return false;
        };

        let Some(domain) = registrable_domain(&parsed) else {
            return false;
        };

        self.valid_hosts.contains(&domain) && self.matches_pattern(url)
    }

    /// Returns true unless the URL path ends in a non-document file extension
    pub fn is_downloadable(&self, url: &str) -> bool {
        is_document_url(url)
    }

    fn matches_pattern(&self, url: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| url.contains(p.as_str()))
    }
}

/// Returns false when the URL's last path segment has a forbidden extension
pub fn is_document_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    let last_segment = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            !FORBIDDEN_EXTENSIONS.contains(&extension.as_str())
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(patterns: &[&str]) -> HostFilter {
        let hosts =
            HostFilter::hosts_from_seeds(&["https://a.test/", "https://www.example.co.uk/"]);
        HostFilter::new(hosts, patterns.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn test_hosts_from_seeds() {
        let hosts =
            HostFilter::hosts_from_seeds(&["https://www.a.test/x", "https://b.test/", "bogus"]);
        assert_eq!(
            hosts.into_iter().collect::<Vec<_>>(),
            vec!["a.test".to_string(), "b.test".to_string()]
        );
    }

    #[test]
    fn test_allows_seed_domain_and_subdomains() {
        let f = filter(&[""]);
        assert!(f.is_allowed("https://a.test/page"));
        assert!(f.is_allowed("https://docs.a.test/page"));
        assert!(f.is_allowed("https://shop.example.co.uk/"));
    }

    #[test]
    fn test_rejects_other_domains() {
        let f = filter(&[""]);
        assert!(!f.is_allowed("https://other.test/x"));
        assert!(!f.is_allowed("https://a.test.evil.com/"));
        assert!(!f.is_allowed("https://other.co.uk/"));
    }

    #[test]
    fn test_rejects_mailto() {
        let f = filter(&[""]);
        assert!(!f.is_allowed("mailto:info@a.test"));
        assert!(!f.is_allowed("MAILTO:info@a.test"));
    }

    #[test]
    fn test_rejects_unparseable() {
        let f = filter(&[""]);
        assert!(!f.is_allowed("::::"));
    }

    #[test]
    fn test_patterns_must_match() {
        let f = filter(&["/en/", "/es/"]);
        assert!(f.is_allowed("https://a.test/en/about"));
        assert!(f.is_allowed("https://a.test/es/contacto"));
        assert!(!f.is_allowed("https://a.test/fr/contact"));
    }

    #[test]
    fn test_empty_pattern_list_matches_all() {
        let f = filter(&[]);
        assert!(f.is_allowed("https://a.test/anything"));
    }

    #[test]
    fn test_forbidden_extensions() {
        let f = filter(&[""]);
        assert!(!f.is_downloadable("https://a.test/report.pdf"));
        assert!(!f.is_downloadable("https://a.test/static/site.CSS"));
        assert!(!f.is_downloadable("https://a.test/media/clip.mp4?autoplay=1"));
        assert!(!f.is_downloadable("https://a.test/bundle.tar.gz"));
    }

    #[test]
    fn test_documents_are_downloadable() {
        let f = filter(&[""]);
        assert!(f.is_downloadable("https://a.test/"));
        assert!(f.is_downloadable("https://a.test/about"));
        assert!(f.is_downloadable("https://a.test/index.html"));
        assert!(f.is_downloadable("https://a.test/page.php?file=x.pdf"));
        assert!(f.is_downloadable("https://a.test/v1.2/notes"));
    }
}
