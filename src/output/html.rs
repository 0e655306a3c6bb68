//! Static HTML export of stored pages
//!
//! Every archived page is written as a plain HTML file under `<dest>/html`, mirroring
//! its URL's host and path, together with an `index.html` linking all of them.

use crate::output::OutputResult;
use crate::storage::JsonPageStore;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use url::Url;

/// Directory under the destination receiving the export
pub const HTML_DIR: &str = "html";

/// Longest path segment kept verbatim
const MAX_SEGMENT_LEN: usize = 80;

/// Result of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Number of pages written
    pub pages: usize,

    /// Path of the generated index
    pub index: PathBuf,
}

/// Exports every stored page of a destination directory to static HTML
///
/// # Arguments
///
/// * `destination` - Crawl output directory holding the `json` archive
///
/// # Returns
///
/// * `Ok(ExportSummary)` - Pages written and the index location
/// * `Err(OutputError)` - The archive could not be read or a file could not be written
pub fn export_html(destination: &Path) -> OutputResult<ExportSummary> {
    let target = destination.join(HTML_DIR);
    std::fs::create_dir_all(&target)?;

    let records = JsonPageStore::new(destination).records()?;
    let mut relative_paths = Vec::with_capacity(records.len());

    for (index, record) in &records {
        let relative = page_path(&record.url, *index);
        let full = target.join(&relative);

        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, &record.raw_content)?;

        relative_paths.push((relative, record.url.as_str()));
    }

    let index = target.join("index.html");
    std::fs::write(&index, render_index(&relative_paths))?;

    Ok(ExportSummary {
        pages: records.len(),
        index,
    })
}

/// Relative export path for a page: `<host>/<segments>/crawled_page_<n>.html`
pub fn page_path(url: &str, counter: u64) -> PathBuf {
    let mut path = PathBuf::new();

    let (host, segments) = match Url::parse(url) {
        Ok(parsed) => {
            let mut host = parsed.host_str().unwrap_or("unknown").to_string();
            if let Some(port) = parsed.port() {
                host = format!("{}:{}", host, port);
            }

            let mut segments: Vec<String> = parsed
                .path_segments()
                .map(|s| s.filter(|s| !s.is_empty()).map(str::to_string).collect())
                .unwrap_or_default();

            if let Some(query) = parsed.query() {
                match segments.last_mut() {
                    Some(last) => {
                        last.push('?');
                        last.push_str(query);
                    }
                    None => segments.push(format!("?{}", query)),
                }
            }
            (host, segments)
        }
        Err(_) => ("unknown".to_string(), vec![url.to_string()]),
    };

    path.push(sanitize_segment(&truncate_segment(&host)));
    for segment in &segments {
        path.push(sanitize_segment(&truncate_segment(segment)));
    }
    path.push(format!("crawled_page_{}.html", counter));
    path
}

/// Shortens long segments, keeping a hash of the full text for uniqueness
fn truncate_segment(segment: &str) -> String {
    if segment.chars().count() <= MAX_SEGMENT_LEN {
        return segment.to_string();
    }

    let hash = format!("{:016x}", xxhash_rust::xxh64::xxh64(segment.as_bytes(), 0));
    let keep = MAX_SEGMENT_LEN - hash.len();
    let mut truncated: String = segment.chars().take(keep).collect();
    truncated.push_str(&hash);
    truncated
}

/// Replaces anything but alphanumerics, `.`, `-` and `_` with `_`
fn sanitize_segment(segment: &str) -> String {
    let sanitized: String = segment
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match sanitized.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => sanitized,
    }
}

fn render_index(pages: &[(PathBuf, &str)]) -> String {
    let mut html = String::from("<html><head><meta charset=\"utf-8\"><title>Crawled pages</title></head><body>\n");
    let _ = writeln!(
        html,
        "<p>{} page(s), exported {}</p>",
        pages.len(),
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    for (relative, url) in pages {
        let href: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let _ = writeln!(
            html,
            "<a href=\"{}\">{}</a><br>",
            html_escape::encode_double_quoted_attribute(&href.join("/")),
            html_escape::encode_text(url)
        );
    }

    html.push_str("</body></html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Fingerprint;
    use crate::storage::{PageRecord, PageStore};
    use tempfile::TempDir;

    #[test]
    fn test_page_path() {
        assert_eq!(
            page_path("https://a.test/docs/intro", 3),
            PathBuf::from("a.test/docs/intro/crawled_page_3.html")
        );
        assert_eq!(
            page_path("https://a.test/", 1),
            PathBuf::from("a.test/crawled_page_1.html")
        );
    }

    #[test]
    fn test_page_path_sanitizes() {
        assert_eq!(
            page_path("http://a.test:8080/caf%C3%A9/search?q=a b", 2),
            PathBuf::from("a.test_8080/caf_C3_A9/search_q_a_20b/crawled_page_2.html")
        );
    }

    #[test]
    fn test_long_segment_is_truncated_with_hash() {
        let long = "x".repeat(200);
        let path = page_path(&format!("https://a.test/{}", long), 1);
        let segment = path
            .components()
            .nth(1)
            .unwrap()
            .as_os_str()
            .to_string_lossy()
            .into_owned();

        assert_eq!(segment.len(), MAX_SEGMENT_LEN);
        assert!(segment.starts_with(&"x".repeat(64)));
        assert_ne!(
            page_path(&format!("https://a.test/{}", long), 1),
            page_path(&format!("https://a.test/{}y", long), 1)
        );
    }

    #[test]
    fn test_export_writes_pages_and_index() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonPageStore::new(dir.path());
        store
            .store(
                1,
                &PageRecord {
                    locale: "en".to_string(),
                    url: "https://a.test/about".to_string(),
                    raw_content: "<html>About</html>".to_string(),
                    content_hash: Fingerprint(1),
                },
            )
            .unwrap();

        let summary = export_html(dir.path()).unwrap();
        assert_eq!(summary.pages, 1);

        let page = dir.path().join("html/a.test/about/crawled_page_1.html");
        assert_eq!(std::fs::read_to_string(page).unwrap(), "<html>About</html>");

        let index = std::fs::read_to_string(summary.index).unwrap();
        assert!(index.contains("href=\"a.test/about/crawled_page_1.html\""));
        assert!(index.contains("https://a.test/about"));
    }

    #[test]
    fn test_export_without_pages() {
        let dir = TempDir::new().unwrap();
        let summary = export_html(dir.path()).unwrap();

        assert_eq!(summary.pages, 0);
        assert!(summary.index.exists());
    }
}
