//! Storage module for persisting crawl data
//!
//! This module handles everything the crawler writes to disk:
//! - The crawl checkpoint used to resume an interrupted run
//! - The archive of stored pages, one compressed record per page
//!
//! Both are gzip-compressed JSON written through a temporary file in the target
//! directory and renamed into place, so a crash never leaves a half-written file behind.

mod checkpoint;
mod pages;
mod traits;

pub use checkpoint::CheckpointStore;
pub use pages::{JsonPageStore, PageRecord};
pub use traits::{PageStore, StorageError, StorageResult};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes a value as gzip-compressed JSON, atomically replacing `path`
///
/// The data is written to a temporary file next to `path`, flushed to disk,
/// then renamed over the destination.
pub(crate) fn write_gz_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let temp_file = NamedTempFile::new_in(dir)?;
    let mut encoder = GzEncoder::new(temp_file, Compression::default());
    serde_json::to_writer(&mut encoder, value)?;
    let temp_file = encoder.finish()?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Reads a gzip-compressed JSON value from `path`
pub(crate) fn read_gz_json<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    Ok(serde_json::from_reader(decoder)?)
}
