//! Repository Implementation - Concrete Adapter for the Repository Port
//!
//! Wraps two `SnapshotFile`s (outcome history, accuracy) and the
//! `BetJournal` into a single struct implementing `Repository`.
//!
//! The usecases layer only knows about the `Repository` trait, never
//! about files or JSON.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::bets::BetJournal;
use super::snapshot::SnapshotFile;
use crate::domain::accuracy::AccuracyState;
use crate::domain::draw::DrawRecord;
use crate::domain::journal::BetEvent;
use crate::ports::repository::Repository;

pub const DRAWS_FILE: &str = "wingo_history.json";
pub const ACCURACY_FILE: &str = "real_accuracy.json";

/// File-backed repository.
pub struct RepositoryImpl {
    draws: SnapshotFile,
    accuracy: SnapshotFile,
    journal: BetJournal,
}

impl RepositoryImpl {
    pub fn new(draws: SnapshotFile, accuracy: SnapshotFile, journal: BetJournal) -> Self {
        Self {
            draws,
            accuracy,
            journal,
        }
    }

    /// Create a repository rooted at `data_dir`, creating it as needed.
    pub async fn from_data_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        let draws = SnapshotFile::new(dir, DRAWS_FILE).await?;
        let accuracy = SnapshotFile::new(dir, ACCURACY_FILE).await?;
        let journal = BetJournal::new(dir).await?;
        Ok(Self::new(draws, accuracy, journal))
    }
}

#[async_trait]
impl Repository for RepositoryImpl {
    async fn save_draws(&self, draws: &[DrawRecord]) -> Result<()> {
        self.draws.save(draws).await
    }

    /// Rows that fail validation are skipped, not fatal.
    async fn load_draws(&self) -> Result<Vec<DrawRecord>> {
        let Some(rows) = self.draws.load::<Vec<serde_json::Value>>().await? else {
            return Ok(Vec::new());
        };

        let total = rows.len();
        let draws: Vec<DrawRecord> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<DrawRecord>(row) {
                Ok(draw) => Some(draw),
                Err(e) => {
                    warn!(error = %e, "Skipping invalid stored draw");
                    None
                }
            })
            .collect();

        if draws.len() < total {
            warn!(kept = draws.len(), total, "Outcome history partially loaded");
        }
        Ok(draws)
    }

    async fn save_accuracy(&self, state: &AccuracyState) -> Result<()> {
        self.accuracy.save(state).await
    }

    async fn load_accuracy(&self) -> Result<Option<AccuracyState>> {
        Ok(self
            .accuracy
            .load::<AccuracyState>()
            .await?
            .map(AccuracyState::normalized))
    }

    async fn append_bet_event(&self, event: &BetEvent) -> Result<()> {
        self.journal.append(event).await
    }

    async fn load_bet_events(&self) -> Result<Vec<BetEvent>> {
        self.journal.load_all().await
    }

    async fn is_healthy(&self) -> bool {
        self.draws.is_healthy().await
            && self.accuracy.is_healthy().await
            && self.journal.is_healthy().await
    }
}
