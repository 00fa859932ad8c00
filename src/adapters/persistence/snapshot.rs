//! Snapshot File - Atomic JSON Persistence
//!
//! Writes a whole value to `<name>` using a tmp file and a rename, so
//! the file on disk is always either the old or the new version, never
//! a partial write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, instrument};

/// One JSON document on disk.
pub struct SnapshotFile {
    /// Final path of the document.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
}

impl SnapshotFile {
    /// Create a snapshot file `file_name` inside `data_dir`.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: &Path, file_name: &str) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            path: data_dir.join(file_name),
            tmp_path: data_dir.join(format!("{file_name}.tmp")),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save atomically (tmp → rename).
    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    pub async fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize snapshot")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp snapshot file")?;

        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename snapshot file")?;

        debug!(bytes = json.len(), "Snapshot saved");
        Ok(())
    }

    /// Load the document.
    ///
    /// Returns `None` if the file does not exist yet (first startup).
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            info!("No snapshot file found, starting fresh");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .await
            .context("Failed to read snapshot file")?;

        let value = serde_json::from_str(&json).context("Failed to parse snapshot JSON")?;
        Ok(Some(value))
    }

    /// Healthy when the file is absent (first run) or readable.
    pub async fn is_healthy(&self) -> bool {
        match fs::try_exists(&self.path).await {
            Ok(false) => true,
            Ok(true) => fs::metadata(&self.path).await.is_ok(),
            Err(_) => false,
        }
    }
}
