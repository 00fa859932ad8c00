//! Bet Journal - Append-only JSONL Bet Events
//!
//! Persists posting decisions to daily JSONL files in the format
//! `bets/YYYY-MM-DD.jsonl`. Each line is a self-contained JSON record,
//! so a crash can at worst lose the line being written.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use crate::domain::journal::BetEvent;

/// Append-only JSONL bet journal with daily file rotation.
pub struct BetJournal {
    /// Directory holding the daily files.
    dir: PathBuf,
}

impl BetJournal {
    /// Create a journal in `<data_dir>/bets`.
    pub async fn new(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("bets");
        fs::create_dir_all(&dir)
            .await
            .context("Failed to create bets directory")?;
        Ok(Self { dir })
    }

    /// Append an event to the file of the day it was recorded.
    #[instrument(skip(self, event), fields(event_id = %event.id, kind = ?event.kind))]
    pub async fn append(&self, event: &BetEvent) -> Result<()> {
        let date = event.recorded_at.format("%Y-%m-%d").to_string();
        let path = self.dir.join(format!("{date}.jsonl"));

        let mut json = serde_json::to_string(event).context("Failed to serialize bet event")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open bet journal file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write bet event")?;

        file.flush().await.context("Failed to flush bet journal")?;

        Ok(())
    }

    /// Load all events from all daily files, oldest first.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<BetEvent>> {
        let mut events = Vec::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .context("Failed to list bets directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "jsonl") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<BetEvent>(line) {
                    Ok(event) => events.push(event),
                    Err(e) => {
                        warn!(
                            file = %path.display(),
                            error = %e,
                            "Skipping malformed bet event"
                        );
                    }
                }
            }
        }

        events.sort_by_key(|e| e.recorded_at);
        info!(count = events.len(), "Loaded bet events");
        Ok(events)
    }

    /// Check if the journal directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}
