//! Per-locale URL frontier
//!
//! Holds the pending and visited sets for every locale. A URL that has been visited in a
//! locale can never become pending in that locale again, and marking a URL visited removes
//! it from the pending set, so the two sets are disjoint after every operation.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Pending and visited URL sets, keyed by locale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontier {
    /// URLs discovered but not yet fetched
    pending: BTreeMap<String, BTreeSet<String>>,

    /// URLs already fetched or permanently discarded
    visited: BTreeMap<String, BTreeSet<String>>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL to a locale's pending set
    ///
    /// # Returns
    ///
    /// `true` if the URL was newly added, `false` if it was already pending or already visited
    pub fn enqueue(&mut self, locale: &str, url: &str) -> bool {
        if self.is_visited(locale, url) {
            return false;
        }

        self.pending
            .entry(locale.to_string())
            .or_default()
            .insert(url.to_string())
    }

    /// Removes up to `n` URLs from a locale's pending set, sampled uniformly without replacement
    ///
    /// Anything drawn must later be marked visited or enqueued again by the caller.
    pub fn draw_batch<R: Rng + ?Sized>(
        &mut self,
        locale: &str,
        n: usize,
        rng: &mut R,
    ) -> Vec<String> {
        let Some(pending) = self.pending.get_mut(locale) else {
            return Vec::new();
        };

        let amount = n.min(pending.len());
        if amount == 0 {
            return Vec::new();
        }

        let mut chosen = index::sample(rng, pending.len(), amount).into_vec();
        chosen.sort_unstable();

        let batch: Vec<String> = pending
            .iter()
            .enumerate()
            .filter(|(i, _)| chosen.binary_search(i).is_ok())
            .map(|(_, url)| url.clone())
            .collect();

        for url in &batch {
            pending.remove(url);
        }

        batch
    }

    /// Records a URL as visited in a locale and drops it from the pending set
    ///
    /// # Returns
    ///
    /// `true` if the URL was not visited before
    pub fn mark_visited(&mut self, locale: &str, url: &str) -> bool {
        if let Some(pending) = self.pending.get_mut(locale) {
            pending.remove(url);
        }

        self.visited
            .entry(locale.to_string())
            .or_default()
            .insert(url.to_string())
    }

    /// Returns true if the URL has been visited in the locale
    pub fn is_visited(&self, locale: &str, url: &str) -> bool {
        self.visited
            .get(locale)
            .is_some_and(|visited| visited.contains(url))
    }

    /// Returns true if the URL is currently pending in the locale
    pub fn is_pending(&self, locale: &str, url: &str) -> bool {
        self.pending
            .get(locale)
            .is_some_and(|pending| pending.contains(url))
    }

    /// Returns true when the locale has no pending URLs
    pub fn is_exhausted(&self, locale: &str) -> bool {
        self.pending_len(locale) == 0
    }

    /// Drops any pending URL of the locale that is also visited
    ///
    /// # Returns
    ///
    /// The number of URLs removed
    pub fn purge_visited(&mut self, locale: &str) -> usize {
        let (Some(pending), Some(visited)) = (self.pending.get_mut(locale), self.visited.get(locale))
        else {
            return 0;
        };

        let before = pending.len();
        pending.retain(|url| !visited.contains(url));
        before - pending.len()
    }

    pub fn pending_len(&self, locale: &str) -> usize {
        self.pending.get(locale).map_or(0, BTreeSet::len)
    }

    pub fn visited_len(&self, locale: &str) -> usize {
        self.visited.get(locale).map_or(0, BTreeSet::len)
    }

    /// Iterates over the pending URLs of a locale in lexical order
    pub fn pending(&self, locale: &str) -> impl Iterator<Item = &str> {
        self.pending
            .get(locale)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }
}
