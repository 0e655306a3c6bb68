use crate::{UrlError, UrlResult};
use url::Url;

/// Canonicalizes a URL so that equivalent spellings compare equal
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Collapse repeated slashes in the path (`/a//b` becomes `/a/b`)
/// 3. Keep the query string verbatim, dropping a bare trailing `?`
/// 4. Strip any fragment
///
/// Parsing also lowercases the host, drops default ports and resolves dot segments,
/// so those variations collapse as well. Non-hierarchical URLs (`mailto:` and friends)
/// only lose their fragment.
///
/// # Examples
///
/// ```
/// use locus::url::canonicalize;
///
/// let url = canonicalize("https://a.test//docs///intro?lang=en#top").unwrap();
/// assert_eq!(url, "https://a.test/docs/intro?lang=en");
/// ```
pub fn canonicalize(raw: &str) -> UrlResult<String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    url.set_fragment(None);

    if url.cannot_be_a_base() {
        return Ok(url.to_string());
    }

    let collapsed = collapse_slashes(url.path());
    url.set_path(&collapsed);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url.to_string())
}

/// Canonicalizes a seed URL, additionally requiring an HTTP(S) scheme and a host
pub fn canonicalize_seed(raw: &str) -> UrlResult<String> {
    let canonical = canonicalize(raw)?;
    let url = Url::parse(&canonical).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS seeds are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(raw.to_string()));
    }

    Ok(canonical)
}

fn collapse_slashes(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_slash = false;

    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        collapsed.push(c);
    }

    collapsed
}
