//! Scripted `PageFetcher` for unit tests

use crate::crawler::{FetchError, PageFetcher, Session};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the fake responds to one URL
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    /// URL reported after navigation; defaults to the requested URL
    pub redirect_to: Option<String>,
    pub markup: String,
    /// Visible text; `None` makes `visible_text` fail
    pub text: Option<String>,
    /// Number of navigations that fail before one succeeds
    pub navigation_failures: u32,
    pub load_times_out: bool,
    /// Delay before navigation completes
    pub delay: Option<Duration>,
}

impl ScriptedPage {
    /// A page with the given body text and links
    pub fn html(text: &str, links: &[&str]) -> Self {
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{}\">link</a>", href))
            .collect();

        Self {
            markup: format!("<html><body><p>{}</p>{}</body></html>", text, anchors),
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn redirected_to(mut self, url: &str) -> Self {
        self.redirect_to = Some(url.to_string());
        self
    }

    pub fn failing_navigation(mut self, failures: u32) -> Self {
        self.navigation_failures = failures;
        self
    }

    pub fn timing_out(mut self) -> Self {
        self.load_times_out = true;
        self
    }

    pub fn without_text(mut self) -> Self {
        self.text = None;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Fake fetcher serving scripted pages and counting navigations
///
/// URLs without a script fail navigation.
#[derive(Debug, Clone, Default)]
pub struct FakeFetcher {
    pages: Arc<HashMap<String, ScriptedPage>>,
    navigations: Arc<Mutex<HashMap<String, u32>>>,
    opened_locales: Arc<Mutex<Vec<String>>>,
}

impl FakeFetcher {
    pub fn new(pages: Vec<(&str, ScriptedPage)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, page)| (url.to_string(), page))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Number of navigation attempts made for `url`
    pub fn navigations(&self, url: &str) -> u32 {
        self.navigations
            .lock()
            .map(|counts| counts.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Locales sessions were opened with, in order
    pub fn opened_locales(&self) -> Vec<String> {
        self.opened_locales
            .lock()
            .map(|locales| locales.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn open(&self, locale: &str) -> Result<Box<dyn Session>, FetchError> {
        if let Ok(mut locales) = self.opened_locales.lock() {
            locales.push(locale.to_string());
        }

        Ok(Box::new(FakeSession {
            fetcher: self.clone(),
            current: None,
            loaded: false,
        }))
    }
}

struct FakeSession {
    fetcher: FakeFetcher,
    current: Option<(String, ScriptedPage)>,
    loaded: bool,
}

#[async_trait]
impl Session for FakeSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), FetchError> {
        let attempt = {
            let mut counts = self
                .fetcher
                .navigations
                .lock()
                .map_err(|_| FetchError::Navigation("poisoned".to_string()))?;
            let count = counts.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let page = self
            .fetcher
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Navigation(format!("no route to {}", url)))?;

        if let Some(delay) = page.delay {
            tokio::time::sleep(delay).await;
        }

        if attempt <= page.navigation_failures {
            return Err(FetchError::Navigation(format!("scripted failure {}", attempt)));
        }

        self.current = Some((url.to_string(), page));
        self.loaded = false;
        Ok(())
    }

    async fn await_load(&mut self, timeout: Duration) -> Result<(), FetchError> {
        match &self.current {
            Some((_, page)) if page.load_times_out => Err(FetchError::Timeout(timeout)),
            Some(_) => {
                self.loaded = true;
                Ok(())
            }
            None => Err(FetchError::Content("not navigated".to_string())),
        }
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        match &self.current {
            Some((_, page)) if self.loaded => Ok(page.markup.clone()),
            _ => Err(FetchError::Content("not loaded".to_string())),
        }
    }

    async fn visible_text(&mut self, _selector: &str) -> Result<String, FetchError> {
        match &self.current {
            Some((_, page)) if self.loaded => page
                .text
                .clone()
                .ok_or_else(|| FetchError::Content("unreadable body".to_string())),
            _ => Err(FetchError::Content("not loaded".to_string())),
        }
    }

    fn current_url(&self) -> Option<String> {
        self.current
            .as_ref()
            .map(|(url, page)| page.redirect_to.clone().unwrap_or_else(|| url.clone()))
    }

    async fn close(&mut self) {
        self.current = None;
        self.loaded = false;
    }
}
