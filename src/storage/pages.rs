use crate::state::Fingerprint;
use crate::storage::{read_gz_json, write_gz_json, PageStore, StorageResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory under the destination holding page records
pub const PAGES_DIR: &str = "json";

const PAGE_SUFFIX: &str = ".json.gz";

/// One stored page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub locale: String,

    /// Canonical final URL
    pub url: String,

    #[serde(rename = "html")]
    pub raw_content: String,

    #[serde(rename = "hash")]
    pub content_hash: Fingerprint,
}

/// Page archive writing one gzip JSON file per record
///
/// Files are named by the zero-padded counter, so lexical order is storage order.
#[derive(Debug, Clone)]
pub struct JsonPageStore {
    dir: PathBuf,
}

impl JsonPageStore {
    /// Creates a store writing under `<destination>/json`
    pub fn new(destination: &Path) -> Self {
        Self {
            dir: destination.join(PAGES_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record with the given counter value
    pub fn record_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{:012}{}", index, PAGE_SUFFIX))
    }

    /// Counter values of the stored records, in ascending order
    ///
    /// Files that do not follow the naming scheme are ignored.
    pub fn indices(&self) -> StorageResult<Vec<u64>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut indices: Vec<u64> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                name.to_str()?.strip_suffix(PAGE_SUFFIX)?.parse::<u64>().ok()
            })
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }

    /// Returns true if at least one record is stored
    pub fn has_records(&self) -> StorageResult<bool> {
        Ok(!self.indices()?.is_empty())
    }

    /// Reads every stored record, ordered by counter
    pub fn records(&self) -> StorageResult<Vec<(u64, PageRecord)>> {
        self.indices()?
            .into_iter()
            .map(|index| -> StorageResult<(u64, PageRecord)> {
                Ok((index, read_gz_json(&self.record_path(index))?))
            })
            .collect()
    }
}

impl PageStore for JsonPageStore {
    fn store(&mut self, index: u64, record: &PageRecord) -> StorageResult<()> {
        let path = self.record_path(index);
        write_gz_json(&path, record)?;
        info!("Storing result in {}", path.display());
        Ok(())
    }
}
