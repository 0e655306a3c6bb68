//! Locus: a resumable multi-locale web crawler
//!
//! This crate discovers and archives pages reachable from a set of seed URLs, once per
//! locale, deduplicating by visible-text fingerprint, restricting traversal to the seeds'
//! registrable domains, and checkpointing enough state to resume after interruption.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Locus operations
#[derive(Debug, Error)]
pub enum LocusError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Invalid engine transition: {from} -> {to}")]
    InvalidTransition {
        from: state::EngineState,
        to: state::EngineState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Cannot create destination {}", .0.display())]
    InvalidDestination(PathBuf),

    #[error("{} already holds a crawl; continue it with `locus resume`", .0.display())]
    DestinationInUse(PathBuf),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Locus operations
pub type Result<T> = std::result::Result<T, LocusError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, FetchOutcome, HttpFetcher, PageFetcher, Session};
pub use state::{CrawlMode, CrawlState, DoneReason, EngineState};
pub use storage::CheckpointStore;
pub use url::{canonicalize, registrable_domain, HostFilter};
