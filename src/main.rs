//! WinGo Signal Bot - Entry Point
//!
//! Initializes configuration, logging, the draw feed and the announcer,
//! then runs the game loop until SIGINT.
//!
//! Wiring sequence:
//! 1. Load `.env`, then config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Open the file repository and the WinGo HTTP feed
//! 4. Pick the announcer (Telegram, or the log sink for dry runs)
//! 5. Restore history + accuracy, warm up from paged history
//! 6. Spawn health, metrics, config watcher and command listener
//! 7. Spawn the game loop
//! 8. Wait for SIGINT, broadcast shutdown, drain tasks

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use wingo_signal_bot::adapters::feeds::WinGoHttpFeed;
use wingo_signal_bot::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use wingo_signal_bot::adapters::notifier::LogAnnouncer;
use wingo_signal_bot::adapters::persistence::RepositoryImpl;
use wingo_signal_bot::config::hot_reload::ConfigWatcher;
use wingo_signal_bot::config::{self, AppConfig};
use wingo_signal_bot::domain::posting::PostingAutomaton;
use wingo_signal_bot::ports::announcer::Announcer;
use wingo_signal_bot::ports::operator::{OperatorRequest, OperatorSender};
use wingo_signal_bot::usecases::{
    AccuracyTracker, GameLoop, OutcomeStore, PolicyController, RoundProcessor, WarmUp,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment + configuration ──────────────────────
    let dotenv = dotenvy::dotenv();
    let config_path =
        std::env::var("WINGO_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.bot.log_level)
                }),
        )
        .json()
        .init();

    if let Err(e) = dotenv {
        info!(reason = %e, "No .env file loaded");
    }
    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.bot.dry_run,
        mode = ?config.posting.mode,
        "Starting WinGo signal bot"
    );

    // ── 3. Shutdown + operator channels ─────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let (operator_tx, operator_rx) = mpsc::channel::<OperatorRequest>(32);

    // ── 4. Observability ────────────────────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let health = Arc::new(HealthState::new());

    // ── 5. Repository + feed ────────────────────────────────
    let repo = Arc::new(
        RepositoryImpl::from_data_dir(&config.persistence.data_dir)
            .await
            .context("Failed to open data directory")?,
    );
    let feed = Arc::new(
        WinGoHttpFeed::new(config.feed.to_feed_config())
            .context("Failed to create WinGo feed")?,
    );

    // ── 6. Announcer + command listener ─────────────────────
    let (announcer, listener_handle) =
        build_announcer(&config, operator_tx.clone(), shutdown_tx.subscribe())?;

    // ── 7. Core state: history, warm-up, accuracy, policy ───
    let mut store = OutcomeStore::load(Arc::clone(&repo), config.history.max_records)
        .await
        .with_metrics(Arc::clone(&metrics));
    WarmUp::new(Arc::clone(&feed), config.feed.warm_up_pages)
        .run(&mut store)
        .await;

    let tracker = AccuracyTracker::load(Arc::clone(&repo))
        .await
        .with_metrics(Arc::clone(&metrics));
    let policy = config
        .posting
        .build_policy()
        .context("Invalid posting configuration")?;
    let (controller, status_rx) = PolicyController::new(policy, Utc::now());

    let arbiter = config.strategies.build_arbiter();
    info!(stages = arbiter.stage_count(), "Strategy arbiter ready");

    let processor = RoundProcessor::new(
        Arc::clone(&repo),
        announcer,
        store,
        tracker,
        arbiter,
        PostingAutomaton::new(config.posting.loss_limit),
        controller,
    )
    .with_metrics(Arc::clone(&metrics));

    let mut game_loop = GameLoop::new(
        Arc::clone(&feed),
        processor,
        operator_rx,
        config.feed.poll_interval(),
        config.feed.idle_interval(),
    )
    .with_health(Arc::clone(&health))
    .with_metrics(Arc::clone(&metrics));

    // ── 8. Spawn servers and side tasks ─────────────────────
    let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port)
        .with_status(status_rx);
    let health_handle = tokio::spawn(health_server.run(shutdown_tx.subscribe()));

    let metrics_handle = if config.metrics.enabled {
        let bind = config.metrics.bind_address.clone();
        Some(tokio::spawn(
            Arc::clone(&metrics).serve(bind, shutdown_tx.subscribe()),
        ))
    } else {
        None
    };

    let (watcher, _config_rx) = ConfigWatcher::new(&config_path, config.clone());
    let mut watcher = watcher.with_operator(operator_tx.clone());
    let watcher_shutdown = shutdown_tx.subscribe();
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watcher.run(watcher_shutdown).await {
            error!(error = %e, "Config watcher failed");
        }
    });

    drop(operator_tx);

    // ── 9. Game loop ────────────────────────────────────────
    let loop_shutdown = shutdown_tx.subscribe();
    let loop_handle = tokio::spawn(async move {
        if let Err(e) = game_loop.run(loop_shutdown).await {
            error!(error = %e, "Game loop failed");
        }
    });

    info!("All tasks spawned, bot is running");

    // ── 10. Wait for SIGINT ─────────────────────────────────
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for SIGINT, shutting down");
    } else {
        info!("SIGINT received, initiating graceful shutdown");
    }

    let _ = shutdown_tx.send(());
    health.set_running(false);

    let _ = tokio::time::timeout(Duration::from_secs(30), loop_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), watcher_handle).await;
    if let Some(handle) = listener_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;

    info!("Shutdown complete");
    Ok(())
}

/// Telegram when configured; the log sink for dry runs.
///
/// Also spawns the command listener when a bot token and admin chat
/// are available.
#[cfg(feature = "telegram")]
fn build_announcer(
    config: &AppConfig,
    operator_tx: OperatorSender,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<(Arc<dyn Announcer>, Option<JoinHandle<()>>)> {
    use std::path::PathBuf;

    use wingo_signal_bot::adapters::notifier::{
        TelegramAnnouncer, TelegramCommandListener, TelegramConfig,
    };

    let token = std::env::var(&config.telegram.token_env)
        .ok()
        .filter(|t| !t.trim().is_empty());
    let admin = config.telegram.admin_chat_id.or_else(|| {
        std::env::var(&config.telegram.admin_chat_id_env)
            .ok()
            .and_then(|v| v.trim().parse().ok())
    });

    let telegram = match (token, admin) {
        (Some(token), Some(admin)) => {
            let mut tg = TelegramConfig::new(token, admin);
            tg.win_sticker = config.telegram.win_sticker.as_ref().map(PathBuf::from);
            tg.messages_per_minute = config.telegram.messages_per_minute;
            Some(tg)
        }
        (Some(_), None) => {
            warn!(
                env = %config.telegram.admin_chat_id_env,
                "Bot token set but no admin chat id, Telegram disabled"
            );
            None
        }
        (None, _) => None,
    };

    let announcer: Arc<dyn Announcer> = match (&telegram, config.bot.dry_run) {
        (_, true) => Arc::new(LogAnnouncer),
        (Some(tg), false) => Arc::new(TelegramAnnouncer::new(tg)),
        (None, false) => anyhow::bail!(
            "{} and an admin chat id are required unless bot.dry_run = true",
            config.telegram.token_env
        ),
    };

    let listener = telegram.map(|tg| {
        let listener = TelegramCommandListener::new(&tg, operator_tx);
        tokio::spawn(listener.run(shutdown_rx))
    });

    Ok((announcer, listener))
}

#[cfg(not(feature = "telegram"))]
fn build_announcer(
    config: &AppConfig,
    _operator_tx: OperatorSender,
    _shutdown_rx: broadcast::Receiver<()>,
) -> Result<(Arc<dyn Announcer>, Option<JoinHandle<()>>)> {
    if !config.bot.dry_run {
        warn!("Built without the telegram feature, announcements go to the log");
    }
    Ok((Arc::new(LogAnnouncer), None))
}
