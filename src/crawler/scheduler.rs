//! Batched fetch scheduling
//!
//! This module handles:
//! - Running up to `batch_size` page fetches concurrently
//! - The retry-once policy for failed navigations
//! - Per-page navigation and load deadlines
//! - Turning each fetch into a `FetchOutcome`

use crate::crawler::{FetchOutcome, LoadedPage, PageFetcher, Session};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, warn};

/// Selector whose text is fingerprinted
pub const FINGERPRINT_SELECTOR: &str = "body";

/// Navigation attempts for a single URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

impl Attempt {
    /// The attempt to make after a failed navigation, if any remain
    fn next(self) -> Option<Self> {
        match self {
            Self::First => Some(Self::Retry),
            Self::Retry => None,
        }
    }
}

/// Fetches batches of URLs with bounded concurrency
#[derive(Debug, Clone)]
pub struct FetchScheduler {
    batch_size: usize,
    navigation_timeout: Duration,
    load_timeout: Duration,
    text_selector: String,
}

impl FetchScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `batch_size` - Maximum number of fetches in flight (at least 1)
    /// * `navigation_timeout` - Deadline for each navigation attempt
    /// * `load_timeout` - Deadline for the page load after navigation
    pub fn new(batch_size: usize, navigation_timeout: Duration, load_timeout: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            navigation_timeout,
            load_timeout,
            text_selector: FINGERPRINT_SELECTOR.to_string(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Fetches every URL, returning outcomes in input order
    ///
    /// Fetches run concurrently up to the batch width. Each URL gets its own session,
    /// opened for `locale` and always closed before its outcome is reported.
    pub async fn fetch_batch(
        &self,
        fetcher: &dyn PageFetcher,
        locale: &str,
        urls: &[String],
    ) -> Vec<(String, FetchOutcome)> {
        stream::iter(urls.iter().cloned())
            .map(|url| async move {
                let outcome = self.fetch_one(fetcher, locale, &url).await;
                (url, outcome)
            })
            .buffered(self.batch_size)
            .collect()
            .await
    }

    /// Fetches a single URL in a fresh session
    pub async fn fetch_one(
        &self,
        fetcher: &dyn PageFetcher,
        locale: &str,
        url: &str,
    ) -> FetchOutcome {
        let mut session = match fetcher.open(locale).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Could not open a [{}] session for {}: {}", locale, url, e);
                return FetchOutcome::NavigationFailed;
            }
        };

        let outcome = self.drive(session.as_mut(), url).await;
        session.close().await;
        outcome
    }

    async fn drive(&self, session: &mut dyn Session, url: &str) -> FetchOutcome {
        let mut attempt = Attempt::First;

        loop {
            match session.navigate(url, self.navigation_timeout).await {
                Ok(()) => break,
                Err(e) => match attempt.next() {
                    Some(next) => {
                        warn!("Failed to retrieve URL {}, retrying one more time... ({})", url, e);
                        attempt = next;
                    }
                    None => {
                        warn!("Couldn't retrieve {}, skipping... ({})", url, e);
                        return FetchOutcome::NavigationFailed;
                    }
                },
            }
        }

        if attempt == Attempt::Retry {
            warn!("Finally {} has been retrieved.", url);
        }

        if let Err(e) = session.await_load(self.load_timeout).await {
            warn!("Loading {} timed out: {}", url, e);
            return FetchOutcome::TimedOut;
        }

        let markup = session.content().await.unwrap_or_else(|e| {
            debug!("No markup for {}: {}", url, e);
            String::new()
        });

        let visible_text = match session.visible_text(&self.text_selector).await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("No visible text for {}: {}", url, e);
                None
            }
        };

        let final_url = session.current_url().unwrap_or_else(|| url.to_string());

        FetchOutcome::Loaded(LoadedPage {
            final_url,
            markup,
            visible_text,
        })
    }
}
