//! Repository Port - State Persistence Interface
//!
//! Three stores, all file based:
//! - the outcome history snapshot (rewritten atomically),
//! - the accuracy counters (rewritten atomically),
//! - the bet journal (append-only JSONL).
//!
//! No database dependency. Snapshots are small (at most 2000 draws)
//! and the journal is an audit trail, never read on the hot path.

use async_trait::async_trait;

use crate::domain::accuracy::AccuracyState;
use crate::domain::draw::DrawRecord;
use crate::domain::journal::BetEvent;

/// Trait for state persistence providers.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
  /// Replace the stored outcome history with `draws` (ascending).
  async fn save_draws(&self, draws: &[DrawRecord]) -> anyhow::Result<()>;

  /// Load the stored outcome history; empty when nothing was saved yet.
  async fn load_draws(&self) -> anyhow::Result<Vec<DrawRecord>>;

  /// Persist the accuracy counters.
  async fn save_accuracy(&self, state: &AccuracyState) -> anyhow::Result<()>;

  /// Load the accuracy counters, `None` when nothing was saved yet.
  async fn load_accuracy(&self) -> anyhow::Result<Option<AccuracyState>>;

  /// Append one entry to the bet journal.
  async fn append_bet_event(&self, event: &BetEvent) -> anyhow::Result<()>;

  /// Load every journal entry (for analysis and backtests).
  async fn load_bet_events(&self) -> anyhow::Result<Vec<BetEvent>>;

  /// Check if the repository is healthy (directory exists, writable).
  async fn is_healthy(&self) -> bool;
}
