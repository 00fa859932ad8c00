//! Prometheus Metrics Registry - Round and Posting Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers round processing latency, strategy selection, bet results,
//! suspensions and feed health.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Centralized Prometheus metrics for the signal bot.
///
/// All metrics follow the naming convention `wingo_bot_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Time spent processing one resolved round (microseconds).
    pub round_latency_us: Histogram,
    /// Resolved rounds processed.
    pub rounds_processed: IntCounter,
    /// Verdicts by winning source.
    pub verdicts: IntCounterVec,
    /// Strategy abstentions by source.
    pub abstentions: IntCounterVec,
    /// Bets announced.
    pub bets_posted: IntCounter,
    /// Settled bets by result (win/loss/expired).
    pub bet_results: IntCounterVec,
    /// Bad series that suspended posting.
    pub bad_series: IntCounter,
    /// Recoverable failures by kind.
    pub errors: IntCounterVec,
    /// Accuracy win rate in percent.
    pub win_rate: Gauge,
    /// Current consecutive lost bets.
    pub consecutive_losses: IntGauge,
    /// Posting suspended (1 = yes).
    pub suspended: IntGauge,
    /// Records in the outcome store.
    pub history_size: IntGauge,
    /// Feed status (1 = last poll succeeded).
    pub feed_up: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let round_latency_us = Histogram::with_opts(
            HistogramOpts::new(
                "wingo_bot_round_latency_us",
                "Round processing latency in microseconds",
            )
            .buckets(vec![
                1_000.0, 5_000.0, 10_000.0, 50_000.0, 100_000.0, 500_000.0, 1_000_000.0,
            ]),
        )?;

        let rounds_processed = IntCounter::new(
            "wingo_bot_rounds_processed_total",
            "Resolved rounds processed",
        )?;

        let verdicts = IntCounterVec::new(
            Opts::new("wingo_bot_verdicts_total", "Verdicts by winning source"),
            &["source"],
        )?;

        let abstentions = IntCounterVec::new(
            Opts::new("wingo_bot_abstentions_total", "Strategy abstentions by source"),
            &["source"],
        )?;

        let bets_posted = IntCounter::new("wingo_bot_bets_posted_total", "Bets announced")?;

        let bet_results = IntCounterVec::new(
            Opts::new("wingo_bot_bet_results_total", "Settled bets by result"),
            &["result"],
        )?;

        let bad_series = IntCounter::new(
            "wingo_bot_bad_series_total",
            "Bad series that suspended posting",
        )?;

        let errors = IntCounterVec::new(
            Opts::new("wingo_bot_errors_total", "Recoverable failures by kind"),
            &["kind"],
        )?;

        let win_rate = Gauge::new("wingo_bot_win_rate_percent", "Prediction win rate in percent")?;

        let consecutive_losses = IntGauge::new(
            "wingo_bot_consecutive_losses",
            "Current run of lost bets",
        )?;

        let suspended = IntGauge::new(
            "wingo_bot_suspended",
            "Whether posting is suspended after a bad series (1=yes, 0=no)",
        )?;

        let history_size = IntGauge::new(
            "wingo_bot_history_size",
            "Records in the outcome store",
        )?;

        let feed_up = IntGauge::new(
            "wingo_bot_feed_up",
            "Feed status (1=last poll succeeded, 0=failed)",
        )?;

        registry.register(Box::new(round_latency_us.clone()))?;
        registry.register(Box::new(rounds_processed.clone()))?;
        registry.register(Box::new(verdicts.clone()))?;
        registry.register(Box::new(abstentions.clone()))?;
        registry.register(Box::new(bets_posted.clone()))?;
        registry.register(Box::new(bet_results.clone()))?;
        registry.register(Box::new(bad_series.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(win_rate.clone()))?;
        registry.register(Box::new(consecutive_losses.clone()))?;
        registry.register(Box::new(suspended.clone()))?;
        registry.register(Box::new(history_size.clone()))?;
        registry.register(Box::new(feed_up.clone()))?;

        Ok(Self {
            registry,
            round_latency_us,
            rounds_processed,
            verdicts,
            abstentions,
            bets_posted,
            bet_results,
            bad_series,
            errors,
            win_rate,
            consecutive_losses,
            suspended,
            history_size,
            feed_up,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move { metrics.render() }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
