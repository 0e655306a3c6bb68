//! Page fetcher interface and HTTP implementation
//!
//! This module handles all page retrieval for the crawler, including:
//! - The `PageFetcher`/`Session` interface the scheduler drives
//! - The `FetchOutcome` values a fetch resolves to
//! - A reqwest-backed fetcher that opens one locale-specific session per page
//! - Error classification into navigation errors and load timeouts

use crate::crawler::parser;
use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client, Response};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a fetch session
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Content unavailable: {0}")]
    Content(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// A page that finished loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    /// URL after redirects, not yet canonicalized
    pub final_url: String,

    /// Raw markup (empty if it could not be read)
    pub markup: String,

    /// Visible text of the fingerprint region, if it could be read
    pub visible_text: Option<String>,
}

/// Result of fetching one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page loaded
    Loaded(LoadedPage),

    /// Navigation succeeded but the page did not load before the deadline
    TimedOut,

    /// Navigation failed on the first attempt and on the retry
    NavigationFailed,
}

/// Factory for locale-specific browsing sessions
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Opens a session whose requests present `locale` as the preferred language
    async fn open(&self, locale: &str) -> Result<Box<dyn Session>, FetchError>;
}

/// One page's worth of browsing
///
/// The scheduler calls `navigate`, then `await_load`, then reads `content`,
/// `visible_text` and `current_url`, and always ends with `close`.
#[async_trait]
pub trait Session: Send {
    /// Starts loading `url`; fails if the target cannot be reached before `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError>;

    /// Waits for the navigated page to finish loading
    async fn await_load(&mut self, timeout: Duration) -> Result<(), FetchError>;

    /// Raw markup of the loaded page
    async fn content(&mut self) -> Result<String, FetchError>;

    /// Text of the first element matching a CSS selector
    async fn visible_text(&mut self, selector: &str) -> Result<String, FetchError>;

    /// URL of the loaded page after redirects
    fn current_url(&self) -> Option<String>;

    async fn close(&mut self);
}

/// Builds the HTTP client shared by all sessions
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats the `Accept-Language` value for a locale
///
/// With `fallback`, non-English locales also accept English at lower priority.
pub fn accept_language(locale: &str, fallback: bool) -> String {
    if fallback && locale != "en" {
        format!("{}, en;q=0.5", locale)
    } else {
        locale.to_string()
    }
}

/// A `PageFetcher` over plain HTTP
///
/// Each session is a single GET request. Loading means reading the response body,
/// and visible text comes from parsing the body.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    fallback: bool,
}

impl HttpFetcher {
    /// Creates a fetcher from a client
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client, usually from [`build_http_client`]
    /// * `fallback` - Whether to add an English fallback to `Accept-Language`
    pub fn new(client: Client, fallback: bool) -> Self {
        Self { client, fallback }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn open(&self, locale: &str) -> Result<Box<dyn Session>, FetchError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            accept_language: accept_language(locale, self.fallback),
            response: None,
            body: None,
            final_url: None,
        }))
    }
}

struct HttpSession {
    client: Client,
    accept_language: String,
    response: Option<Response>,
    body: Option<String>,
    final_url: Option<String>,
}

#[async_trait]
impl Session for HttpSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        let request = self
            .client
            .get(url)
            .header(ACCEPT_LANGUAGE, &self.accept_language)
            .send();

        let response = match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(FetchError::Navigation(e.to_string())),
            Err(_) => {
                return Err(FetchError::Navigation(format!(
                    "no response within {:?}",
                    timeout
                )))
            }
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Navigation(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
            return Err(FetchError::Navigation(format!(
                "unsupported content type {:?}",
                content_type
            )));
        }

        self.final_url = Some(response.url().to_string());
        self.response = Some(response);
        self.body = None;
        Ok(())
    }

    async fn await_load(&mut self, timeout: Duration) -> Result<(), FetchError> {
        let response = self
            .response
            .take()
            .ok_or_else(|| FetchError::Content("no navigation in progress".to_string()))?;

        match tokio::time::timeout(timeout, response.text()).await {
            Ok(Ok(body)) => {
                self.body = Some(body);
                Ok(())
            }
            Ok(Err(e)) => Err(FetchError::Client(e)),
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        self.body
            .clone()
            .ok_or_else(|| FetchError::Content("page not loaded".to_string()))
    }

    async fn visible_text(&mut self, selector: &str) -> Result<String, FetchError> {
        let body = self
            .body
            .as_deref()
            .ok_or_else(|| FetchError::Content("page not loaded".to_string()))?;

        parser::visible_text(body, selector)
            .ok_or_else(|| FetchError::Content(format!("no element matches {:?}", selector)))
    }

    fn current_url(&self) -> Option<String> {
        self.final_url.clone()
    }

    async fn close(&mut self) {
        self.response = None;
        self.body = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client();
        assert!(client.is_ok());
    }

    #[test]
    fn test_accept_language() {
        assert_eq!(accept_language("es", true), "es, en;q=0.5");
        assert_eq!(accept_language("es", false), "es");
        assert_eq!(accept_language("en", true), "en");
    }

    #[tokio::test]
    async fn test_session_requires_navigation() {
        let fetcher = HttpFetcher::new(build_http_client().unwrap(), true);
        let mut session = fetcher.open("en").await.unwrap();

        assert!(session.current_url().is_none());
        assert!(matches!(
            session.await_load(Duration::from_millis(100)).await,
            Err(FetchError::Content(_))
        ));
        assert!(session.content().await.is_err());
        session.close().await;
    }

    // Request-level behavior is covered with wiremock in the integration tests
}
