//! Outcome Store - Ordered, Capped Draw History
//!
//! Keeps the most recent resolved draws keyed by period, ascending.
//! Every mutation rewrites the snapshot through the repository. A failed
//! write is logged and counted but the in-memory history stays
//! authoritative for the running process.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::draw::{DrawRecord, Period, SizeClass};
use crate::error::BotError;
use crate::ports::repository::Repository;

pub struct OutcomeStore<R: Repository> {
  repo: Arc<R>,
  records: BTreeMap<Period, DrawRecord>,
  max_records: usize,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl<R: Repository> OutcomeStore<R> {
  /// Empty store.
  pub fn new(repo: Arc<R>, max_records: usize) -> Self {
    Self {
      repo,
      records: BTreeMap::new(),
      max_records: max_records.max(1),
      metrics: None,
    }
  }

  /// Restore the persisted history. A read failure starts empty.
  pub async fn load(repo: Arc<R>, max_records: usize) -> Self {
    let mut store = Self::new(repo, max_records);
    match store.repo.load_draws().await {
      Ok(draws) => {
        for draw in draws {
          store.records.insert(draw.period.clone(), draw);
        }
        store.evict();
        info!(records = store.records.len(), "Outcome history loaded");
      }
      Err(e) => {
        warn!(error = %e, "Failed to load outcome history, starting empty");
      }
    }
    store
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Upsert one draw by period and persist the snapshot.
  pub async fn append(&mut self, record: DrawRecord) {
    if self.upsert(record) {
      self.persist().await;
    }
  }

  /// Upsert a batch with a single persist.
  pub async fn append_many(&mut self, records: impl IntoIterator<Item = DrawRecord>) {
    let mut changed = false;
    for record in records {
      changed |= self.upsert(record);
    }
    if changed {
      self.persist().await;
    }
  }

  /// All records, ascending by period.
  pub fn read_all(&self) -> Vec<DrawRecord> {
    self.records.values().cloned().collect()
  }

  /// Size classes of all records, ascending by period.
  pub fn sizes(&self) -> Vec<SizeClass> {
    self.records.values().map(|d| d.size).collect()
  }

  pub fn latest(&self) -> Option<&DrawRecord> {
    self.records.values().next_back()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Returns false when an identical record was already stored.
  fn upsert(&mut self, record: DrawRecord) -> bool {
    if let Some(existing) = self.records.get(&record.period) {
      if existing.same_outcome(&record) {
        debug!(period = %record.period, "Draw already stored");
        return false;
      }
      warn!(
        period = %record.period,
        old = existing.value,
        new = record.value,
        "Replacing stored draw"
      );
    }
    self.records.insert(record.period.clone(), record);
    self.evict();
    true
  }

  fn evict(&mut self) {
    while self.records.len() > self.max_records {
      self.records.pop_first();
    }
  }

  async fn persist(&self) {
    if let Err(e) = self.repo.save_draws(&self.read_all()).await {
      let err = BotError::persistence("outcome history", e);
      warn!(error = %err, "Keeping in-memory history");
      if let Some(m) = &self.metrics {
        m.errors.with_label_values(&[err.kind()]).inc();
      }
    }
  }
}
