//! Configuration module for Locus
//!
//! This module handles loading, parsing, and validating the optional TOML settings
//! file, plus the run invariants checked before any network activity.
//!
//! # Example
//!
//! ```no_run
//! use locus::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("locus.toml")).unwrap();
//! println!("Crawler will fetch {} pages at once", config.crawler.batch_size);
//! ```

mod locales;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, LogLevel, LoggingConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};

// Re-export validation
pub use locales::{is_iso_639_1, ISO_639_1};
pub use validation::{
    validate, validate_destination, validate_fresh_destination, validate_locales,
    validate_patterns, validate_seeds,
};

