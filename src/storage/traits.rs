//! Storage traits and error types
//!
//! This module defines the trait interface for page archive backends and
//! associated error types.

use crate::storage::PageRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No checkpoint found at {}", .0.display())]
    CheckpointNotFound(PathBuf),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page archive implementations
///
/// The engine is the only writer. Each record is written once under the stored-page
/// counter value it was assigned and never rewritten.
pub trait PageStore {
    /// Persists one page record
    ///
    /// # Arguments
    ///
    /// * `index` - The stored-page counter value for this record (starting at 1)
    /// * `record` - The page to persist
    fn store(&mut self, index: u64, record: &PageRecord) -> StorageResult<()>;
}
