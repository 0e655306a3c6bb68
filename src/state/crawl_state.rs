//! The persisted crawl state
//!
//! `CrawlState` is the single unit written to and restored from a checkpoint. It is built by
//! one of three named constructors: [`CrawlState::fresh`] for a new crawl,
//! [`CrawlState::download`] for an archival URL list, and [`CrawlState::resume`] for
//! continuing from a checkpoint directory.

use crate::state::dedup::ContentDeduplicator;
use crate::state::frontier::Frontier;
use crate::storage::{CheckpointStore, StorageResult};
use crate::url::{canonicalize_seed, HostFilter};
use crate::{ConfigError, LocusError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Locale used by download mode
pub const DOWNLOAD_LOCALE: &str = "en";

/// Whether the run follows links or only archives its seed list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// Multi-locale crawl with link extraction and content deduplication
    Crawl,

    /// Sequential single-locale fetch of the seed URLs only
    Download,
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crawl => write!(f, "crawl"),
            Self::Download => write!(f, "download"),
        }
    }
}

/// Tunables for a fresh crawl
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub patterns: Vec<String>,
    pub max_pages: u64,
    pub batch_size: usize,
    pub max_no_progress_rounds: u32,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            max_pages: 10_000_000,
            batch_size: 10,
            max_no_progress_rounds: 5,
        }
    }
}

/// Full state of a crawl run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlState {
    /// Canonical seed URLs
    pub seed_urls: Vec<String>,

    /// Seed URLs as the operator supplied them
    pub original_seed_urls: Vec<String>,

    pub locales: Vec<String>,
    pub current_locale: String,

    #[serde(flatten)]
    pub frontier: Frontier,

    #[serde(flatten)]
    pub dedup: ContentDeduplicator,

    /// Registrable domains derived from the seeds
    pub valid_hosts: BTreeSet<String>,

    /// Substrings a URL must contain; the empty string matches everything
    pub patterns: Vec<String>,

    pub destination: PathBuf,

    /// Number of pages stored so far; also the name of the latest artifact
    pub stored_count: u64,

    /// Pages stored per locale, duplicates kept by download mode included
    #[serde(default)]
    pub stored_per_locale: BTreeMap<String, u64>,

    /// Stop after this many stored pages; 0 means unlimited
    pub max_pages: u64,

    pub no_progress_rounds: u32,
    pub max_no_progress_rounds: u32,

    pub batch_size: usize,
    pub mode: CrawlMode,
}

impl CrawlState {
    /// Creates the state for a new crawl and seeds the first locale's frontier
    ///
    /// # Arguments
    ///
    /// * `seeds` - Seed URLs; each must be HTTP(S)
    /// * `locales` - Locale codes in crawl order; must not be empty
    /// * `destination` - Output directory
    /// * `options` - Patterns, limits and batch width
    pub fn fresh(
        seeds: Vec<String>,
        locales: Vec<String>,
        destination: PathBuf,
        options: CrawlOptions,
    ) -> Result<Self, LocusError> {
        let first_locale = locales
            .first()
            .cloned()
            .ok_or_else(|| ConfigError::Validation("At least one locale is required".to_string()))?;

        if seeds.is_empty() {
            return Err(
                ConfigError::Validation("At least one seed URL is required".to_string()).into(),
            );
        }

        let seed_urls = seeds
            .iter()
            .map(|seed| canonicalize_seed(seed))
            .collect::<Result<Vec<_>, _>>()?;

        let patterns = if options.patterns.is_empty() {
            vec![String::new()]
        } else {
            options.patterns
        };

        let mut state = Self {
            valid_hosts: HostFilter::hosts_from_seeds(&seed_urls),
            seed_urls,
            original_seed_urls: seeds,
            locales,
            current_locale: first_locale.clone(),
            frontier: Frontier::new(),
            dedup: ContentDeduplicator::new(),
            patterns,
            destination,
            stored_count: 0,
            stored_per_locale: BTreeMap::new(),
            max_pages: options.max_pages,
            no_progress_rounds: 0,
            max_no_progress_rounds: options.max_no_progress_rounds,
            batch_size: options.batch_size.max(1),
            mode: CrawlMode::Crawl,
        };

        state.seed_locale(&first_locale);
        Ok(state)
    }

    /// Creates the state for an archival download of a URL list
    ///
    /// Download mode uses a single locale and fetches one page at a time.
    pub fn download(
        seeds: Vec<String>,
        destination: PathBuf,
        max_pages: u64,
    ) -> Result<Self, LocusError> {
        let options = CrawlOptions {
            max_pages,
            batch_size: 1,
            ..CrawlOptions::default()
        };

        let locales = vec![DOWNLOAD_LOCALE.to_string()];
        let mut state = Self::fresh(seeds, locales, destination, options)?;
        state.mode = CrawlMode::Download;
        Ok(state)
    }

    /// Restores the state checkpointed in `dir`
    ///
    /// The destination is replaced by `dir`, so a moved output directory still resumes.
    pub fn resume(dir: &Path) -> StorageResult<Self> {
        Self::resume_with_limit(dir, None)
    }

    /// Restores the state checkpointed in `dir`, replacing its page limit if one is given
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory holding the checkpoint
    /// * `max_pages` - New page limit, 0 for unlimited; `None` keeps the checkpointed one
    pub fn resume_with_limit(dir: &Path, max_pages: Option<u64>) -> StorageResult<Self> {
        let mut state = CheckpointStore::in_dir(dir).load()?;
        state.destination = dir.to_path_buf();
        if let Some(max_pages) = max_pages {
            state.max_pages = max_pages;
        }
        Ok(state)
    }

    /// Enqueues every seed for the locale; seeds already visited there are skipped
    ///
    /// # Returns
    ///
    /// The number of seeds added
    pub fn seed_locale(&mut self, locale: &str) -> usize {
        self.seed_urls
            .iter()
            .filter(|seed| self.frontier.enqueue(locale, seed))
            .count()
    }

    /// Moves the cursor to the next locale and seeds its frontier
    ///
    /// # Returns
    ///
    /// `false` if the current locale was the last one
    pub fn advance_locale(&mut self) -> bool {
        let position = self.locales.iter().position(|l| *l == self.current_locale);

        let next = match position {
            Some(i) => self.locales.get(i + 1).cloned(),
            None => None,
        };

        match next {
            Some(locale) => {
                self.current_locale = locale.clone();
                self.no_progress_rounds = 0;
                self.seed_locale(&locale);
                true
            }
            None => false,
        }
    }

    /// Returns true once the stored page count has reached a non-zero limit
    pub fn limit_reached(&self) -> bool {
        self.max_pages > 0 && self.stored_count >= self.max_pages
    }

    /// Counts a page stored under `locale` as artifact number `index`
    pub fn record_stored(&mut self, locale: &str, index: u64) {
        self.stored_count = index;
        *self.stored_per_locale.entry(locale.to_string()).or_default() += 1;
    }

    /// Number of pages stored under `locale`
    pub fn stored_in(&self, locale: &str) -> u64 {
        self.stored_per_locale.get(locale).copied().unwrap_or(0)
    }

    /// Builds the host filter for this crawl's hosts and patterns
    pub fn host_filter(&self) -> HostFilter {
        HostFilter::new(self.valid_hosts.clone(), self.patterns.clone())
    }

    /// Locales from the current cursor to the end
    pub fn remaining_locales(&self) -> &[String] {
        let start = self
            .locales
            .iter()
            .position(|l| *l == self.current_locale)
            .unwrap_or(self.locales.len());
        &self.locales[start..]
    }
}
