//! Output module for exporting crawl results
//!
//! This module handles:
//! - Exporting archived pages as a browsable static HTML tree
//! - Computing and displaying crawl statistics

mod html;
pub mod stats;

pub use html::{export_html, page_path, ExportSummary, HTML_DIR};
pub use stats::{print_statistics, CrawlStatistics, LocaleStatistics};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read page archive: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
