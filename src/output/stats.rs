//! Statistics generation from crawl state
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from a live or checkpointed `CrawlState`.

use crate::state::{CrawlMode, CrawlState};

/// Progress of one locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleStatistics {
    pub locale: String,

    /// URLs discovered but not yet fetched
    pub pending: usize,

    /// URLs fetched or discarded
    pub visited: usize,

    /// Pages stored while crawling this locale
    pub stored: u64,
}

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    pub mode: CrawlMode,
    pub current_locale: String,

    /// Total number of pages stored
    pub stored_pages: u64,

    /// Number of distinct content fingerprints
    pub distinct_fingerprints: usize,

    /// Page limit, 0 for unlimited
    pub max_pages: u64,

    /// One entry per locale, in crawl order
    pub locales: Vec<LocaleStatistics>,
}

impl CrawlStatistics {
    /// Collects statistics from a crawl state
    pub fn from_state(state: &CrawlState) -> Self {
        let locales = state
            .locales
            .iter()
            .map(|locale| LocaleStatistics {
                locale: locale.clone(),
                pending: state.frontier.pending_len(locale),
                visited: state.frontier.visited_len(locale),
                stored: state.stored_in(locale),
            })
            .collect();

        Self {
            mode: state.mode,
            current_locale: state.current_locale.clone(),
            stored_pages: state.stored_count,
            distinct_fingerprints: state.dedup.len(),
            max_pages: state.max_pages,
            locales,
        }
    }

    /// Total pending URLs across locales
    pub fn total_pending(&self) -> usize {
        self.locales.iter().map(|l| l.pending).sum()
    }

    /// Writes the statistics to the log
    pub fn log(&self) {
        tracing::info!(
            "Crawl statistics: {} page(s) stored, {} distinct fingerprint(s), {} URL(s) pending",
            self.stored_pages,
            self.distinct_fingerprints,
            self.total_pending()
        );

        for locale in &self.locales {
            tracing::info!(
                "  [{}] pending: {}, visited: {}, stored: {}",
                locale.locale,
                locale.pending,
                locale.visited,
                locale.stored
            );
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Mode: {}", stats.mode);
    println!("  Current locale: {}", stats.current_locale);
    if stats.max_pages > 0 {
        println!("  Pages stored: {} of {}", stats.stored_pages, stats.max_pages);
    } else {
        println!("  Pages stored: {}", stats.stored_pages);
    }
    println!("  Distinct fingerprints: {}", stats.distinct_fingerprints);
    println!("  URLs pending: {}", stats.total_pending());
    println!();

    println!("Locales:");
    for locale in &stats.locales {
        let marker = if locale.locale == stats.current_locale {
            "*"
        } else {
            " "
        };
        println!(
            " {} {}: {} pending, {} visited, {} stored",
            marker, locale.locale, locale.pending, locale.visited, locale.stored
        );
    }
    println!();
}
