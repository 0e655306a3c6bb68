use url::{Host, Url};

/// Extracts the registrable domain of a URL
///
/// The registrable domain is the public suffix plus one label, looked up in the
/// public suffix list: `blog.example.co.uk` belongs to `example.co.uk`, so every
/// subdomain of an allowed site collapses to the same key. Hosts that have no
/// registrable part (IP addresses, `localhost`) are returned as they are.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use locus::url::registrable_domain;
///
/// let url = Url::parse("https://docs.example.co.uk/page").unwrap();
/// assert_eq!(registrable_domain(&url), Some("example.co.uk".to_string()));
/// ```
pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_lowercase();
            let registrable = psl::domain_str(&domain)
                .map(str::to_string)
                .unwrap_or(domain);
            Some(registrable)
        }
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

/// Parses a URL string and extracts its registrable domain
pub fn registrable_domain_str(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(registrable_domain)
}
