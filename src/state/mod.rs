//! State module for tracking crawl progress
//!
//! This module provides the persisted crawl state and the pieces it is made of.
//!
//! # Components
//!
//! - `CrawlState`: Everything a checkpoint holds (seeds, locales, counters, frontier, fingerprints)
//! - `Frontier`: Per-locale pending and visited URL sets
//! - `ContentDeduplicator`: Global and per-locale sets of stored content fingerprints
//! - `EngineState`: Lifecycle of the crawl engine (init, active locale, done)

mod crawl_state;
mod dedup;
mod engine_state;
mod frontier;

// Re-export main types
pub use crawl_state::{CrawlMode, CrawlOptions, CrawlState, DOWNLOAD_LOCALE};
pub use dedup::{ContentDeduplicator, Fingerprint};
pub use engine_state::{DoneReason, EngineState};
pub use frontier::Frontier;
