//! Persistence Adapters - JSON Snapshots and a JSONL Journal
//!
//! Implements the Repository port with plain files:
//! - `wingo_history.json`: the outcome history, rewritten atomically
//! - `real_accuracy.json`: the accuracy counters, rewritten atomically
//! - `bets/YYYY-MM-DD.jsonl`: the append-only bet journal
//!
//! No database dependency, lightweight and crash-recoverable.

pub mod bets;
pub mod repository_impl;
pub mod snapshot;

pub use bets::BetJournal;
pub use repository_impl::RepositoryImpl;
pub use snapshot::SnapshotFile;
