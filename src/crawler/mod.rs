//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Browser-like page sessions with navigation retry
//! - HTML parsing and link extraction
//! - Concurrent batch fetching
//! - The locale-by-locale crawl engine

mod engine;
mod fetcher;
mod parser;
mod scheduler;

#[cfg(test)]
pub mod testing;

pub use engine::{CrawlEngine, EngineSettings, CHECKPOINT_INTERVAL};
pub use fetcher::{
    accept_language, build_http_client, FetchError, FetchOutcome, HttpFetcher, LoadedPage,
    PageFetcher, Session,
};
pub use parser::{visible_text, ExtractedLinks, LinkExtractor};
pub use scheduler::{FetchScheduler, FINGERPRINT_SELECTOR};
