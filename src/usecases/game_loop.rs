//! Game Loop - Poll, Dedupe, Process, Sleep
//!
//! The single task that owns all core state. Every cycle it:
//! 1. Applies queued operator commands
//! 2. Polls the feed for the latest resolved draw
//! 3. Skips the cycle when there is no data or the period was seen
//! 4. Runs the round processor on a new period
//!
//! Operator commands that arrive while the loop sleeps are applied
//! right away; none is ever applied in the middle of a round.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::domain::draw::Period;
use crate::error::BotError;
use crate::ports::announcer::Announcer;
use crate::ports::draw_feed::DrawFeed;
use crate::ports::operator::{OperatorReceiver, OperatorRequest};
use crate::ports::repository::Repository;

use super::round_processor::{RoundOutcome, RoundProcessor};

/// What one poll did.
#[derive(Debug)]
pub enum PollOutcome {
  Processed(RoundOutcome),
  /// Latest period was already processed.
  Duplicate,
  /// Feed error, empty response or invalid draw.
  NoData,
}

pub struct GameLoop<F: DrawFeed, R: Repository, A: Announcer + ?Sized> {
  feed: Arc<F>,
  processor: RoundProcessor<R, A>,
  operator_rx: Option<OperatorReceiver>,
  poll_interval: Duration,
  idle_interval: Duration,
  last_period: Option<Period>,
  health: Option<Arc<HealthState>>,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl<F: DrawFeed, R: Repository, A: Announcer + ?Sized> GameLoop<F, R, A> {
  pub fn new(
    feed: Arc<F>,
    processor: RoundProcessor<R, A>,
    operator_rx: OperatorReceiver,
    poll_interval: Duration,
    idle_interval: Duration,
  ) -> Self {
    Self {
      feed,
      processor,
      operator_rx: Some(operator_rx),
      poll_interval,
      idle_interval,
      last_period: None,
      health: None,
      metrics: None,
    }
  }

  pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
    self.health = Some(health);
    self
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn processor(&self) -> &RoundProcessor<R, A> {
    &self.processor
  }

  pub fn last_period(&self) -> Option<&Period> {
    self.last_period.as_ref()
  }

  /// Run until shutdown.
  #[instrument(skip(self, shutdown_rx), name = "game_loop")]
  pub async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let Some(mut operator_rx) = self.operator_rx.take() else {
      anyhow::bail!("Game loop already ran");
    };

    info!(
      poll_secs = self.poll_interval.as_secs(),
      history = self.processor.store().len(),
      "Game loop started"
    );
    self.set_running(true);

    let mut next_poll = Instant::now();
    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Shutdown signal received, stopping game loop");
          break;
        }
        Some(request) = operator_rx.recv() => {
          self.handle_request(request);
        }
        _ = tokio::time::sleep_until(next_poll) => {
          while let Ok(request) = operator_rx.try_recv() {
            self.handle_request(request);
          }
          let delay = match self.poll_once().await {
            PollOutcome::NoData => self.idle_interval,
            PollOutcome::Duplicate | PollOutcome::Processed(_) => self.poll_interval,
          };
          next_poll = Instant::now() + delay;
        }
      }
    }

    self.set_running(false);
    self.operator_rx = Some(operator_rx);
    Ok(())
  }

  /// Apply one operator request and answer it.
  pub fn handle_request(&mut self, request: OperatorRequest) {
    let ack = self.processor.handle_command(&request.command, Utc::now());
    if let Some(reply) = request.reply {
      if reply.send(ack).is_err() {
        debug!("Operator stopped waiting for the reply");
      }
    }
  }

  /// One feed poll, processing the draw when its period is new.
  pub async fn poll_once(&mut self) -> PollOutcome {
    let raw = match self.feed.latest().await {
      Ok(Some(raw)) => raw,
      Ok(None) => {
        self.data_unavailable(BotError::DataUnavailable("empty response".to_string()));
        return PollOutcome::NoData;
      }
      Err(e) => {
        self.data_unavailable(BotError::DataUnavailable(format!("{e:#}")));
        return PollOutcome::NoData;
      }
    };
    self.set_feed(true);

    let draw = match raw.into_record(Utc::now()) {
      Ok(draw) => draw,
      Err(e) => {
        let err = BotError::from(e);
        warn!(error = %err, "Feed returned an invalid draw");
        self.count_error(&err);
        return PollOutcome::NoData;
      }
    };

    if self
      .last_period
      .as_ref()
      .is_some_and(|last| draw.period <= *last)
    {
      debug!(period = %draw.period, "Period already processed");
      return PollOutcome::Duplicate;
    }
    self.last_period = Some(draw.period.clone());

    let outcome = self.processor.process(draw, Utc::now()).await;

    if let Some(health) = &self.health {
      health.set_storage(self.processor.storage_healthy().await);
    }
    PollOutcome::Processed(outcome)
  }

  fn data_unavailable(&self, err: BotError) {
    warn!(error = %err, "No draw this cycle");
    self.count_error(&err);
    self.set_feed(false);
  }

  fn count_error(&self, err: &BotError) {
    if let Some(m) = &self.metrics {
      m.errors.with_label_values(&[err.kind()]).inc();
    }
  }

  fn set_feed(&self, up: bool) {
    if let Some(health) = &self.health {
      health.set_feed(up);
    }
    if let Some(m) = &self.metrics {
      m.feed_up.set(i64::from(up));
    }
  }

  fn set_running(&self, running: bool) {
    if let Some(health) = &self.health {
      health.set_running(running);
    }
  }
}
