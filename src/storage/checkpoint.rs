use crate::state::CrawlState;
use crate::storage::{read_gz_json, write_gz_json, StorageError, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Checkpoint file name inside the destination directory
pub const CHECKPOINT_FILE: &str = "crawler.json.gz";

/// Saves and restores the full crawl state
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Creates a store for an explicit checkpoint path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates a store for the checkpoint inside a destination directory
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CHECKPOINT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the state, replacing any previous checkpoint atomically
    pub fn save(&self, state: &CrawlState) -> StorageResult<()> {
        write_gz_json(&self.path, state)?;
        info!(
            "Persisted crawl state to {} ({} pages stored)",
            self.path.display(),
            state.stored_count
        );
        Ok(())
    }

    /// Reads the checkpointed state
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlState)` - The state exactly as it was saved
    /// * `Err(StorageError::CheckpointNotFound)` - No checkpoint exists at the path
    pub fn load(&self) -> StorageResult<CrawlState> {
        match read_gz_json(&self.path) {
            Ok(state) => Ok(state),
            Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::CheckpointNotFound(self.path.clone()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Deletes the checkpoint; a missing file is not an error
    pub fn remove(&self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed checkpoint {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
