//! Integration Tests - End-to-end Bot Component Testing
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use mockall::mock;
use mockall::predicate::*;
use tokio::sync::{broadcast, mpsc};
use tokio_test::assert_ok;

use wingo_signal_bot::domain::accuracy::AccuracyState;
use wingo_signal_bot::domain::arbiter::Arbiter;
use wingo_signal_bot::domain::draw::{DrawRecord, SizeClass};
use wingo_signal_bot::domain::journal::{BetEvent, BetEventKind};
use wingo_signal_bot::domain::policy::{Channel, PolicyCommand, PostingMode, PostingPolicy};
use wingo_signal_bot::domain::posting::{Effect, PostingAutomaton, PostingState};
use wingo_signal_bot::ports::announcer::{BetAnnouncement, RoundReport, WinNotice};
use wingo_signal_bot::ports::draw_feed::RawDraw;
use wingo_signal_bot::ports::operator::OperatorRequest;
use wingo_signal_bot::usecases::{
    AccuracyTracker, GameLoop, OutcomeStore, PollOutcome, PolicyController, RoundProcessor, WarmUp,
};

// ---- Mock Definitions ----

mock! {
    pub Feed {}

    #[async_trait::async_trait]
    impl wingo_signal_bot::ports::draw_feed::DrawFeed for Feed {
        async fn latest(&self) -> anyhow::Result<Option<RawDraw>>;
        async fn history_page(&self, page: u32) -> anyhow::Result<Vec<RawDraw>>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Repo {}

    #[async_trait::async_trait]
    impl wingo_signal_bot::ports::repository::Repository for Repo {
        async fn save_draws(&self, draws: &[DrawRecord]) -> anyhow::Result<()>;
        async fn load_draws(&self) -> anyhow::Result<Vec<DrawRecord>>;
        async fn save_accuracy(&self, state: &AccuracyState) -> anyhow::Result<()>;
        async fn load_accuracy(&self) -> anyhow::Result<Option<AccuracyState>>;
        async fn append_bet_event(&self, event: &BetEvent) -> anyhow::Result<()>;
        async fn load_bet_events(&self) -> anyhow::Result<Vec<BetEvent>>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Announcer {}

    #[async_trait::async_trait]
    impl wingo_signal_bot::ports::announcer::Announcer for Announcer {
        async fn post_bet(&self, bet: &BetAnnouncement) -> anyhow::Result<()>;
        async fn post_win(&self, win: &WinNotice) -> anyhow::Result<()>;
        async fn post_bad_series(&self, channel: &Channel, game_name: &str) -> anyhow::Result<()>;
        async fn report_round(&self, report: &RoundReport) -> anyhow::Result<()>;
    }
}

// ---- Helpers ----

/// A repository that accepts every write.
fn accepting_repo() -> MockRepo {
    let mut repo = MockRepo::new();
    repo.expect_save_draws().returning(|_| Ok(()));
    repo.expect_save_accuracy().returning(|_| Ok(()));
    repo.expect_append_bet_event().returning(|_| Ok(()));
    repo.expect_is_healthy().returning(|| true);
    repo
}

fn policy(mode: PostingMode) -> PostingPolicy {
    PostingPolicy::new(
        mode,
        "BDG",
        vec![Channel {
            name: "MAIN".to_string(),
            target: "@main".to_string(),
        }],
        FixedOffset::east_opt(330 * 60).unwrap(),
    )
}

fn processor(
    repo: MockRepo,
    announcer: MockAnnouncer,
    mode: PostingMode,
) -> RoundProcessor<MockRepo, MockAnnouncer> {
    let repo = Arc::new(repo);
    let (controller, _rx) = PolicyController::new(policy(mode), Utc::now());
    RoundProcessor::new(
        Arc::clone(&repo),
        Arc::new(announcer),
        OutcomeStore::new(Arc::clone(&repo), 2000),
        AccuracyTracker::new(Arc::clone(&repo), AccuracyState::new()),
        // no stages: every verdict follows the last size
        Arbiter::new(51.0, 99.0),
        PostingAutomaton::new(4),
        controller,
    )
}

fn draw(period: &str, value: i64) -> DrawRecord {
    RawDraw::new(period, value).into_record(Utc::now()).unwrap()
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_game_loop_skips_repeated_period() {
    let mut feed = MockFeed::new();
    let mut polls = vec![
        Some(RawDraw::new("20240101100010001", 7)),
        Some(RawDraw::new("20240101100010001", 7)),
        Some(RawDraw::new("20240101100010002", 3)),
    ]
    .into_iter();
    feed.expect_latest()
        .times(3)
        .returning(move || Ok(polls.next().flatten()));

    let mut announcer = MockAnnouncer::new();
    announcer.expect_report_round().times(2).returning(|_| Ok(()));

    let processor = processor(accepting_repo(), announcer, PostingMode::ForcedOff);
    let (_tx, rx) = mpsc::channel(4);
    let mut game_loop = GameLoop::new(
        Arc::new(feed),
        processor,
        rx,
        Duration::from_millis(10),
        Duration::from_millis(10),
    );

    assert!(matches!(game_loop.poll_once().await, PollOutcome::Processed(_)));
    assert!(matches!(game_loop.poll_once().await, PollOutcome::Duplicate));
    match game_loop.poll_once().await {
        PollOutcome::Processed(outcome) => {
            assert!(outcome.scored.is_some());
            assert_eq!(outcome.size, SizeClass::Small);
        }
        other => panic!("expected a processed round, got {other:?}"),
    }
    assert_eq!(game_loop.processor().store().len(), 2);
    assert_eq!(game_loop.processor().tracker().state().total_bets, 1);
}

#[tokio::test]
async fn test_feed_failure_and_invalid_draw_are_no_data() {
    let mut feed = MockFeed::new();
    let mut polls = vec![
        Err(anyhow::anyhow!("all domains failed")),
        Ok(None),
        Ok(Some(RawDraw::new("20240101100010001", 42))),
    ]
    .into_iter();
    feed.expect_latest()
        .times(3)
        .returning(move || polls.next().unwrap_or(Ok(None)));

    let processor = processor(MockRepo::new(), MockAnnouncer::new(), PostingMode::ForcedOn);
    let (_tx, rx) = mpsc::channel(4);
    let mut game_loop = GameLoop::new(
        Arc::new(feed),
        processor,
        rx,
        Duration::from_millis(10),
        Duration::from_millis(10),
    );

    for _ in 0..3 {
        assert!(matches!(game_loop.poll_once().await, PollOutcome::NoData));
    }
    assert!(game_loop.processor().store().is_empty());
    assert!(game_loop.last_period().is_none());
}

#[tokio::test]
async fn test_persistence_failure_does_not_stop_round() {
    let mut repo = MockRepo::new();
    repo.expect_save_draws()
        .returning(|_| Err(anyhow::anyhow!("disk full")));
    repo.expect_save_accuracy()
        .returning(|_| Err(anyhow::anyhow!("disk full")));
    repo.expect_append_bet_event()
        .returning(|_| Err(anyhow::anyhow!("disk full")));

    let mut announcer = MockAnnouncer::new();
    announcer.expect_post_bet().times(1).returning(|_| Ok(()));
    announcer.expect_report_round().returning(|_| Ok(()));

    let mut p = processor(repo, announcer, PostingMode::ForcedOn);
    let outcome = p.process(draw("100", 8), Utc::now()).await;

    assert_eq!(p.store().len(), 1);
    assert!(matches!(&outcome.effects[..], [Effect::NewBet { .. }]));
    // only the journal write failed; the bet itself went out
    assert_eq!(outcome.failures, 1);
    assert!(matches!(p.automaton().state(), PostingState::Armed(_)));
}

#[tokio::test]
async fn test_delivery_failure_keeps_automaton_state() {
    let mut announcer = MockAnnouncer::new();
    announcer
        .expect_post_bet()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("telegram down")));
    announcer
        .expect_report_round()
        .returning(|_| Err(anyhow::anyhow!("telegram down")));

    let mut repo = MockRepo::new();
    repo.expect_save_draws().returning(|_| Ok(()));
    repo.expect_save_accuracy().returning(|_| Ok(()));
    repo.expect_append_bet_event()
        .withf(|e| e.kind == BetEventKind::Posted && !e.announced)
        .times(1)
        .returning(|_| Ok(()));
    repo.expect_is_healthy().returning(|| true);

    let mut p = processor(repo, announcer, PostingMode::ForcedOn);
    let outcome = p.process(draw("100", 2), Utc::now()).await;

    assert_eq!(outcome.failures, 2);
    let armed = p.automaton().armed_bet().unwrap();
    assert_eq!(armed.period.as_str(), "101");
    assert_eq!(armed.pick, SizeClass::Small);
}

#[tokio::test]
async fn test_win_announced_with_resolved_value() {
    let mut announcer = MockAnnouncer::new();
    announcer.expect_post_bet().times(2).returning(|_| Ok(()));
    announcer
        .expect_post_win()
        .withf(|win| win.period.as_str() == "101" && win.value == 9 && win.game_name == "BDG")
        .times(1)
        .returning(|_| Ok(()));
    announcer.expect_report_round().times(2).returning(|_| Ok(()));

    let mut p = processor(accepting_repo(), announcer, PostingMode::ForcedOn);
    p.process(draw("100", 6), Utc::now()).await;
    let outcome = p.process(draw("101", 9), Utc::now()).await;

    assert!(matches!(outcome.effects[0], Effect::Win { announce: true, .. }));
    assert_eq!(p.automaton().consecutive_losses(), 0);
}

#[tokio::test]
async fn test_bad_series_posted_once() {
    let mut announcer = MockAnnouncer::new();
    announcer.expect_post_bet().returning(|_| Ok(()));
    announcer
        .expect_post_bad_series()
        .withf(|_, game_name| game_name == "BDG")
        .times(1)
        .returning(|_, _| Ok(()));
    announcer.expect_report_round().returning(|_| Ok(()));

    let mut repo = MockRepo::new();
    repo.expect_save_draws().returning(|_| Ok(()));
    repo.expect_save_accuracy().returning(|_| Ok(()));
    repo.expect_append_bet_event()
        .withf(|e| e.kind != BetEventKind::Won)
        .returning(|_| Ok(()));

    let mut p = processor(repo, announcer, PostingMode::ForcedOn);
    // alternating sizes lose every trend bet
    for (i, value) in [7, 2, 7, 2, 7, 2, 7].iter().enumerate() {
        p.process(draw(&(100 + i).to_string(), *value), Utc::now()).await;
    }
    assert!(p.automaton().is_suspended());
    assert_eq!(p.automaton().consecutive_losses(), 4);
}

#[tokio::test]
async fn test_operator_commands_applied_by_running_loop() {
    let mut feed = MockFeed::new();
    feed.expect_latest().returning(|| Ok(None));

    let processor = processor(MockRepo::new(), MockAnnouncer::new(), PostingMode::ForcedOff);
    let (tx, rx) = mpsc::channel(4);
    let mut game_loop = GameLoop::new(
        Arc::new(feed),
        processor,
        rx,
        Duration::from_millis(20),
        Duration::from_millis(20),
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move {
        game_loop.run(shutdown_rx).await.unwrap();
        game_loop
    });

    let (request, reply) = OperatorRequest::with_reply(PolicyCommand::ForceOn);
    assert_ok!(tx.send(request).await);
    assert_eq!(reply.await.unwrap(), "Posting forced ON");

    let (request, reply) = OperatorRequest::with_reply(PolicyCommand::EnableSchedule);
    assert_ok!(tx.send(request).await);
    assert!(reply.await.unwrap().starts_with("Error:"));

    let (request, reply) = OperatorRequest::with_reply(PolicyCommand::Status);
    assert_ok!(tx.send(request).await);
    let panel = reply.await.unwrap();
    assert!(panel.contains("Status: FORCE ON"));

    shutdown_tx.send(()).unwrap();
    let game_loop = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(
        game_loop
            .processor()
            .controller()
            .status(Utc::now())
            .should_post
    );
}

#[tokio::test]
async fn test_warm_up_stops_at_first_failed_page() {
    let mut feed = MockFeed::new();
    feed.expect_history_page().with(eq(1)).times(1).returning(|_| {
        Ok((0..10)
            .map(|i| RawDraw::new(format!("{}", 120 - i), i % 10))
            .collect())
    });
    feed.expect_history_page().with(eq(2)).times(1).returning(|_| {
        Ok(vec![
            RawDraw::new("110", 4),
            RawDraw::new("109", 11),
            RawDraw::new("108", 1),
        ])
    });
    feed.expect_history_page()
        .with(eq(3))
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("timeout")));

    let repo = Arc::new(accepting_repo());
    let mut store = OutcomeStore::new(repo, 2000);
    let report = WarmUp::new(Arc::new(feed), 100).run(&mut store).await;

    assert_eq!(report.pages, 2);
    assert_eq!(report.draws, 12);
    assert_eq!(report.invalid, 1);
    assert_eq!(store.len(), 12);

    let periods: Vec<String> = store.read_all().iter().map(|d| d.period.to_string()).collect();
    assert_eq!(periods.first().map(String::as_str), Some("108"));
    assert_eq!(periods.last().map(String::as_str), Some("120"));
}
