//! Accuracy Tracker - Scoring Predictions Against Real Outcomes
//!
//! Wraps the persisted [`AccuracyState`]. Each resolved round that had a
//! prediction targeting it is scored once and the counters are written
//! back immediately. Persistence failures are logged and counted; the
//! in-memory counters keep going.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::accuracy::{AccuracyState, BetResult};
use crate::domain::draw::SizeClass;
use crate::error::BotError;
use crate::ports::repository::Repository;

pub struct AccuracyTracker<R: Repository> {
  repo: Arc<R>,
  state: AccuracyState,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl<R: Repository> AccuracyTracker<R> {
  pub fn new(repo: Arc<R>, state: AccuracyState) -> Self {
    Self {
      repo,
      state,
      metrics: None,
    }
  }

  /// Restore persisted counters; missing or unreadable state starts at zero.
  pub async fn load(repo: Arc<R>) -> Self {
    let state = match repo.load_accuracy().await {
      Ok(Some(state)) => {
        info!(
          total_bets = state.total_bets,
          win_rate = state.win_rate(),
          "Accuracy counters loaded"
        );
        state
      }
      Ok(None) => AccuracyState::new(),
      Err(e) => {
        warn!(error = %e, "Failed to load accuracy counters, starting from zero");
        AccuracyState::new()
      }
    };
    Self::new(repo, state)
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn state(&self) -> &AccuracyState {
    &self.state
  }

  /// Score `prior` against `real` and persist.
  ///
  /// No-op without a prior prediction.
  pub async fn update(&mut self, real: SizeClass, prior: Option<SizeClass>) -> Option<BetResult> {
    let result = self.state.record(real, prior)?;

    if let Err(e) = self.repo.save_accuracy(&self.state).await {
      let err = BotError::persistence("accuracy", e);
      warn!(error = %err, "Keeping in-memory accuracy counters");
      if let Some(m) = &self.metrics {
        m.errors.with_label_values(&[err.kind()]).inc();
      }
    }
    if let Some(m) = &self.metrics {
      m.win_rate.set(self.state.win_rate());
    }

    Some(result)
  }
}
