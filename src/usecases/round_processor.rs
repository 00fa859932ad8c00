//! Round Processor - The Per-Round Pipeline
//!
//! One resolved draw in, one [`RoundOutcome`] out:
//! 1. Append the draw to the outcome store
//! 2. Score the pending prediction if it targeted this period
//! 3. Run the strategies over the full history and arbitrate
//! 4. Ask the posting policy whether to publish
//! 5. Step the posting automaton and carry out its effects
//! 6. Remember the verdict as the pending prediction
//! 7. Send the operator round report and update metrics
//!
//! Nothing here is fatal. Persistence and delivery failures are logged,
//! counted and skipped; the automaton state is never rolled back.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::accuracy::BetResult;
use crate::domain::arbiter::Arbiter;
use crate::domain::draw::{DrawRecord, Period, SizeClass};
use crate::domain::journal::BetEvent;
use crate::domain::policy::PolicyCommand;
use crate::domain::posting::{Effect, PostingAutomaton, PostingState};
use crate::domain::prediction::{Opinion, Verdict};
use crate::error::BotError;
use crate::ports::announcer::{Announcer, BetAnnouncement, RoundReport, WinNotice};
use crate::ports::repository::Repository;

use super::accuracy_tracker::AccuracyTracker;
use super::outcome_store::OutcomeStore;
use super::policy_controller::PolicyController;

/// The last verdict, waiting for the period it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPrediction {
  pub target_period: Period,
  pub pick: SizeClass,
}

/// Summary of one processed round.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
  pub period: Period,
  pub value: u8,
  pub size: SizeClass,
  /// Result of scoring the pending prediction, if one targeted this round.
  pub scored: Option<BetResult>,
  pub verdict: Verdict,
  pub should_post: bool,
  pub effects: Vec<Effect>,
  /// Announcements or journal writes that failed.
  pub failures: usize,
}

pub struct RoundProcessor<R: Repository, A: Announcer + ?Sized> {
  repo: Arc<R>,
  announcer: Arc<A>,
  store: OutcomeStore<R>,
  tracker: AccuracyTracker<R>,
  arbiter: Arbiter,
  automaton: PostingAutomaton,
  controller: PolicyController,
  pending: Option<PendingPrediction>,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl<R: Repository, A: Announcer + ?Sized> RoundProcessor<R, A> {
  pub fn new(
    repo: Arc<R>,
    announcer: Arc<A>,
    store: OutcomeStore<R>,
    tracker: AccuracyTracker<R>,
    arbiter: Arbiter,
    automaton: PostingAutomaton,
    controller: PolicyController,
  ) -> Self {
    Self {
      repo,
      announcer,
      store,
      tracker,
      arbiter,
      automaton,
      controller,
      pending: None,
      metrics: None,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn store(&self) -> &OutcomeStore<R> {
    &self.store
  }

  pub fn tracker(&self) -> &AccuracyTracker<R> {
    &self.tracker
  }

  pub fn automaton(&self) -> &PostingAutomaton {
    &self.automaton
  }

  pub fn controller(&self) -> &PolicyController {
    &self.controller
  }

  pub fn pending(&self) -> Option<&PendingPrediction> {
    self.pending.as_ref()
  }

  pub async fn storage_healthy(&self) -> bool {
    self.repo.is_healthy().await
  }

  /// Run the full pipeline for one newly resolved draw.
  #[instrument(skip(self, draw), fields(period = %draw.period, value = draw.value))]
  pub async fn process(&mut self, draw: DrawRecord, now: DateTime<Utc>) -> RoundOutcome {
    let start = Instant::now();

    // 1. History
    self.store.append(draw.clone()).await;

    // 2. Score the prediction that targeted this period
    let prior = self
      .pending
      .take()
      .filter(|p| p.target_period == draw.period)
      .map(|p| p.pick);
    let scored = self.tracker.update(draw.size, prior).await;

    // 3. Strategies + arbiter
    let history = self.store.sizes();
    let arbitration = self.arbiter.select(&history, draw.size);
    let verdict = arbitration.verdict;
    if let Some(m) = &self.metrics {
      m.verdicts.with_label_values(&[verdict.source.metric_id()]).inc();
      for candidate in &arbitration.candidates {
        if let Opinion::Abstain(reason) = &candidate.opinion {
          debug!(source = %candidate.source, reason = %reason, "Strategy abstained");
          m.abstentions
            .with_label_values(&[candidate.source.metric_id()])
            .inc();
        }
      }
    }

    // 4. Policy
    let status = self.controller.status(now);

    // 5. Automaton + effects
    let effects = self
      .automaton
      .on_round_resolved(&draw, &verdict, status.should_post);
    let mut failures = 0;
    for effect in &effects {
      failures += self.dispatch(effect, &draw.period, now).await;
    }

    // 6. Pending prediction for the next period
    self.pending = Some(PendingPrediction {
      target_period: draw.period.next(),
      pick: verdict.pick,
    });

    // 7. Operator report
    let accuracy = self.tracker.state();
    let report = RoundReport {
      game_name: self.controller.policy().game_name().to_string(),
      status_label: status.label.clone(),
      period: draw.period.clone(),
      value: draw.value,
      size: draw.size,
      verdict,
      win_rate: accuracy.win_rate(),
      total_bets: accuracy.total_bets,
      consecutive_losses: self.automaton.consecutive_losses(),
      suspended: self.automaton.is_suspended(),
    };
    if let Err(e) = self.announcer.report_round(&report).await {
      failures += 1;
      self.record_error(BotError::delivery("round report", e));
    }
    self.controller.publish(now);

    if let Some(m) = &self.metrics {
      m.rounds_processed.inc();
      m.round_latency_us.observe(start.elapsed().as_micros() as f64);
      m.history_size.set(self.store.len() as i64);
      m.consecutive_losses
        .set(i64::from(self.automaton.consecutive_losses()));
      m.suspended.set(i64::from(self.automaton.is_suspended()));
      m.win_rate.set(accuracy.win_rate());
    }

    info!(
      size = %draw.size,
      pick = %verdict.pick,
      confidence = verdict.confidence,
      source = %verdict.source,
      should_post = status.should_post,
      scored = ?scored,
      effects = effects.len(),
      latency_us = start.elapsed().as_micros() as u64,
      "Round processed"
    );

    RoundOutcome {
      period: draw.period,
      value: draw.value,
      size: draw.size,
      scored,
      verdict,
      should_post: status.should_post,
      effects,
      failures,
    }
  }

  /// Apply an operator command and return the acknowledgement text.
  #[instrument(skip(self))]
  pub fn handle_command(&mut self, command: &PolicyCommand, now: DateTime<Utc>) -> String {
    match command {
      PolicyCommand::Resume => {
        if self.automaton.resume() {
          info!("Posting resumed by operator");
          if let Some(m) = &self.metrics {
            m.suspended.set(0);
            m.consecutive_losses.set(0);
          }
          "Posting resumed".to_string()
        } else {
          "Posting was not suspended".to_string()
        }
      }
      PolicyCommand::Status => self.controller.panel(now, &self.status_lines()),
      other => match self.controller.apply(other, now) {
        Ok(ack) => ack,
        Err(e) => {
          let err = BotError::from(e);
          let text = format!("Error: {err}");
          self.record_error(err);
          text
        }
      },
    }
  }

  fn status_lines(&self) -> Vec<String> {
    let posting = match self.automaton.state() {
      PostingState::Idle => "IDLE".to_string(),
      PostingState::Armed(bet) => format!("ARMED {} on {}", bet.pick, bet.period.tail(3)),
      PostingState::Suspended => format!(
        "SUSPENDED after {} losses",
        self.automaton.consecutive_losses()
      ),
    };
    let accuracy = self.tracker.state();
    vec![
      format!("Posting: {posting}"),
      format!(
        "Win rate: {:.1}% over {} bets",
        accuracy.win_rate(),
        accuracy.total_bets
      ),
      format!("History: {} rounds", self.store.len()),
    ]
  }

  /// Carry out one effect. Returns the number of failed side effects.
  async fn dispatch(&self, effect: &Effect, resolved: &Period, now: DateTime<Utc>) -> usize {
    let mut failures = 0;
    let policy = self.controller.policy();
    let game_name = policy.game_name().to_string();
    let channel = policy.active_channel().cloned();

    let delivery = match (effect, channel) {
      (Effect::NewBet { bet }, Some(channel)) => {
        self.count(|m| m.bets_posted.inc());
        let announcement = BetAnnouncement {
          channel,
          game_name,
          period: bet.period.clone(),
          pick: bet.pick,
          confidence: bet.confidence,
          source: bet.source,
        };
        Some(("bet", self.announcer.post_bet(&announcement).await))
      }
      (
        Effect::Win {
          bet,
          value,
          announce,
        },
        channel,
      ) => {
        self.count(|m| m.bet_results.with_label_values(&["win"]).inc());
        match channel.filter(|_| *announce) {
          Some(channel) => {
            let notice = WinNotice {
              channel,
              game_name,
              period: bet.period.clone(),
              value: *value,
              size: SizeClass::from_value(*value),
            };
            Some(("win", self.announcer.post_win(&notice).await))
          }
          None => None,
        }
      }
      (Effect::Loss { .. }, _) => {
        self.count(|m| m.bet_results.with_label_values(&["loss"]).inc());
        None
      }
      (Effect::Expired { bet }, _) => {
        debug!(period = %bet.period, "Armed bet expired unscored");
        self.count(|m| m.bet_results.with_label_values(&["expired"]).inc());
        None
      }
      (Effect::BadSeries { consecutive_losses }, Some(channel)) => {
        warn!(consecutive_losses, "Bad series, posting suspended");
        self.count(|m| m.bad_series.inc());
        Some((
          "bad series",
          self.announcer.post_bad_series(&channel, &game_name).await,
        ))
      }
      (Effect::NewBet { .. } | Effect::BadSeries { .. }, None) => {
        warn!("No channel configured, announcement skipped");
        None
      }
    };

    let announced = matches!(delivery, Some((_, Ok(()))));
    if let Some((what, Err(e))) = delivery {
      failures += 1;
      self.record_error(BotError::delivery(what, e));
    }

    let event = BetEvent::from_effect(
      effect,
      resolved,
      self.automaton.consecutive_losses(),
      announced,
      now,
    );
    if let Err(e) = self.repo.append_bet_event(&event).await {
      failures += 1;
      self.record_error(BotError::persistence("bet journal", e));
    }

    failures
  }

  fn count(&self, f: impl FnOnce(&MetricsRegistry)) {
    if let Some(m) = &self.metrics {
      f(m);
    }
  }

  fn record_error(&self, err: BotError) {
    warn!(error = %err, kind = err.kind(), "Round side effect failed");
    self.count(|m| m.errors.with_label_values(&[err.kind()]).inc());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::FixedOffset;
  use std::sync::Mutex;

  use crate::adapters::persistence::RepositoryImpl;
  use crate::domain::journal::BetEventKind;
  use crate::domain::policy::{Channel, PostingMode, PostingPolicy};

  /// Records every call instead of posting.
  #[derive(Default)]
  struct Recorder {
    calls: Mutex<Vec<String>>,
    reject_bets: bool,
  }

  #[async_trait::async_trait]
  impl Announcer for Recorder {
    async fn post_bet(&self, bet: &BetAnnouncement) -> anyhow::Result<()> {
      self.calls.lock().unwrap().push(format!("bet {}", bet.period));
      if self.reject_bets {
        anyhow::bail!("chat not found");
      }
      Ok(())
    }

    async fn post_win(&self, win: &WinNotice) -> anyhow::Result<()> {
      self.calls.lock().unwrap().push(format!("win {}", win.period));
      Ok(())
    }

    async fn post_bad_series(&self, _channel: &Channel, _game: &str) -> anyhow::Result<()> {
      self.calls.lock().unwrap().push("bad".to_string());
      Ok(())
    }

    async fn report_round(&self, _report: &RoundReport) -> anyhow::Result<()> {
      Ok(())
    }
  }

  fn draw(period: &str, value: i64) -> DrawRecord {
    DrawRecord::new(Period::parse(period).unwrap(), value, Utc::now()).unwrap()
  }

  async fn processor(
    dir: &tempfile::TempDir,
    mode: PostingMode,
  ) -> (RoundProcessor<RepositoryImpl, Recorder>, Arc<Recorder>, Arc<RepositoryImpl>) {
    let channels = vec![Channel {
      name: "MAIN".to_string(),
      target: "@main".to_string(),
    }];
    processor_with(dir, mode, channels, Recorder::default()).await
  }

  async fn processor_with(
    dir: &tempfile::TempDir,
    mode: PostingMode,
    channels: Vec<Channel>,
    recorder: Recorder,
  ) -> (RoundProcessor<RepositoryImpl, Recorder>, Arc<Recorder>, Arc<RepositoryImpl>) {
    let repo = Arc::new(RepositoryImpl::from_data_dir(dir.path()).await.unwrap());
    let announcer = Arc::new(recorder);
    let policy = PostingPolicy::new(
      mode,
      "bdg",
      channels,
      FixedOffset::east_opt(330 * 60).unwrap(),
    );
    let (controller, _rx) = PolicyController::new(policy, Utc::now());
    let processor = RoundProcessor::new(
      Arc::clone(&repo),
      Arc::clone(&announcer),
      OutcomeStore::new(Arc::clone(&repo), 2000),
      AccuracyTracker::new(Arc::clone(&repo), Default::default()),
      Arbiter::default(),
      PostingAutomaton::new(4),
      controller,
    );
    (processor, announcer, repo)
  }

  #[tokio::test]
  async fn test_posting_off_only_scores() {
    let dir = tempfile::tempdir().unwrap();
    let (mut p, announcer, _) = processor(&dir, PostingMode::ForcedOff).await;

    let first = p.process(draw("100", 7), Utc::now()).await;
    assert_eq!(first.scored, None);
    assert!(first.effects.is_empty());
    assert_eq!(p.pending().unwrap().target_period.as_str(), "101");

    let second = p.process(draw("101", 2), Utc::now()).await;
    assert!(second.scored.is_some());
    assert_eq!(p.tracker().state().total_bets, 1);
    assert!(announcer.calls.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_skipped_round_is_not_scored() {
    let dir = tempfile::tempdir().unwrap();
    let (mut p, _, _) = processor(&dir, PostingMode::ForcedOff).await;

    p.process(draw("100", 7), Utc::now()).await;
    let outcome = p.process(draw("102", 7), Utc::now()).await;
    assert_eq!(outcome.scored, None);
    assert_eq!(p.tracker().state().total_bets, 0);
  }

  #[tokio::test]
  async fn test_forced_on_posts_and_journals() {
    let dir = tempfile::tempdir().unwrap();
    let (mut p, announcer, repo) = processor(&dir, PostingMode::ForcedOn).await;

    // Blind trend on a single draw: Big after a 7
    let first = p.process(draw("100", 7), Utc::now()).await;
    assert_eq!(first.verdict.pick, SizeClass::Big);
    assert!(matches!(&first.effects[..], [Effect::NewBet { .. }]));

    let second = p.process(draw("101", 8), Utc::now()).await;
    assert!(matches!(
      second.effects[0],
      Effect::Win { announce: true, .. }
    ));
    assert_eq!(second.failures, 0);

    let calls = announcer.calls.lock().unwrap().clone();
    assert_eq!(calls, vec!["bet 101", "win 101", "bet 102"]);

    let events = repo.load_bet_events().await.unwrap();
    assert!(events.iter().all(|e| e.announced));
    let kinds: Vec<_> = events.into_iter().map(|e| e.kind).collect();
    assert_eq!(
      kinds,
      vec![BetEventKind::Posted, BetEventKind::Won, BetEventKind::Posted]
    );
  }

  #[tokio::test]
  async fn test_failed_bet_post_journaled_unannounced() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder {
      reject_bets: true,
      ..Default::default()
    };
    let channels = vec![Channel {
      name: "MAIN".to_string(),
      target: "@main".to_string(),
    }];
    let (mut p, _, repo) = processor_with(&dir, PostingMode::ForcedOn, channels, recorder).await;

    let outcome = p.process(draw("100", 7), Utc::now()).await;
    assert!(matches!(&outcome.effects[..], [Effect::NewBet { .. }]));
    assert_eq!(outcome.failures, 1);

    let events = repo.load_bet_events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, BetEventKind::Posted);
    assert!(!events[0].announced);
  }

  #[tokio::test]
  async fn test_bet_without_channel_journaled_unannounced() {
    let dir = tempfile::tempdir().unwrap();
    let (mut p, announcer, repo) =
      processor_with(&dir, PostingMode::ForcedOn, Vec::new(), Recorder::default()).await;

    p.process(draw("100", 7), Utc::now()).await;
    assert!(announcer.calls.lock().unwrap().is_empty());

    let events = repo.load_bet_events().await.unwrap();
    assert_eq!(events[0].kind, BetEventKind::Posted);
    assert!(!events[0].announced);
  }

  #[tokio::test]
  async fn test_bad_series_suspends_until_resume() {
    let dir = tempfile::tempdir().unwrap();
    let (mut p, announcer, _) = processor(&dir, PostingMode::ForcedOn).await;

    // Blind trend keeps picking the last size; alternate so every bet loses
    let values = [7, 2, 7, 2, 7];
    for (i, value) in values.iter().enumerate() {
      p.process(draw(&(100 + i).to_string(), *value), Utc::now())
        .await;
    }
    assert!(p.automaton().is_suspended());
    assert_eq!(
      announcer
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| *c == "bad")
        .count(),
      1
    );

    let suspended = p.process(draw("105", 2), Utc::now()).await;
    assert!(suspended.effects.is_empty());

    assert_eq!(p.handle_command(&PolicyCommand::Resume, Utc::now()), "Posting resumed");
    let resumed = p.process(draw("106", 2), Utc::now()).await;
    assert!(matches!(&resumed.effects[..], [Effect::NewBet { .. }]));
  }

  #[tokio::test]
  async fn test_commands_and_status_panel() {
    let dir = tempfile::tempdir().unwrap();
    let (mut p, _, _) = processor(&dir, PostingMode::ForcedOff).await;

    assert_eq!(
      p.handle_command(&PolicyCommand::SetGameName("tc".to_string()), Utc::now()),
      "Game name: TC"
    );
    let err = p.handle_command(&PolicyCommand::SelectChannel("nope".to_string()), Utc::now());
    assert!(err.starts_with("Error:"));

    let panel = p.handle_command(&PolicyCommand::Status, Utc::now());
    assert!(panel.contains("Game: TC"));
    assert!(panel.contains("Posting: IDLE"));
    assert_eq!(
      p.handle_command(&PolicyCommand::Resume, Utc::now()),
      "Posting was not suspended"
    );
  }
}
