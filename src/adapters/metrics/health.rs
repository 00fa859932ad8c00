//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live and /ready endpoints via axum 0.7 for Docker
//! health checks. Readiness depends on the last feed poll and on the
//! data directory being writable. /status returns the latest posting
//! policy snapshot as JSON.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument};

use crate::domain::policy::PolicySnapshot;

/// Shared health state polled by the readiness check.
#[derive(Debug)]
pub struct HealthState {
    /// Whether the last feed poll succeeded.
    pub feed_healthy: AtomicBool,
    /// Whether the repository accepted the last write.
    pub storage_healthy: AtomicBool,
    /// Whether the game loop is running.
    pub loop_running: AtomicBool,
}

impl HealthState {
    /// Create a new health state (all healthy by default).
    pub fn new() -> Self {
        Self {
            feed_healthy: AtomicBool::new(true),
            storage_healthy: AtomicBool::new(true),
            loop_running: AtomicBool::new(false),
        }
    }

    pub fn set_feed(&self, healthy: bool) {
        self.feed_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn set_storage(&self, healthy: bool) {
        self.storage_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn set_running(&self, running: bool) {
        self.loop_running.store(running, Ordering::Relaxed);
    }

    /// Check if the bot is fully operational.
    pub fn is_ready(&self) -> bool {
        self.loop_running.load(Ordering::Relaxed)
            && self.feed_healthy.load(Ordering::Relaxed)
            && self.storage_healthy.load(Ordering::Relaxed)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct ServerState {
    health: Arc<HealthState>,
    status: Option<watch::Receiver<PolicySnapshot>>,
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
    /// Health state shared with all components.
    state: Arc<HealthState>,
    /// Policy snapshots published by the policy controller.
    status: Option<watch::Receiver<PolicySnapshot>>,
    /// Bind port (default 8080 from config).
    port: u16,
}

impl HealthServer {
    /// Create a new health server.
    pub fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self {
            state,
            status: None,
            port,
        }
    }

    /// Serve the policy snapshot on `/status`.
    pub fn with_status(mut self, status: watch::Receiver<PolicySnapshot>) -> Self {
        self.status = Some(status);
        self
    }

    fn router(health: Arc<HealthState>, status: Option<watch::Receiver<PolicySnapshot>>) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/status", get(Self::status))
            .with_state(ServerState { health, status })
    }

    /// Run the health check server until shutdown.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Self::router(Arc::clone(&self.state), self.status.clone());

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness: returns 200 only if feed, storage and loop are healthy.
    async fn readiness(State(state): State<ServerState>) -> impl IntoResponse {
        if state.health.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    /// Latest posting policy snapshot; 404 when no controller is attached.
    async fn status(State(state): State<ServerState>) -> impl IntoResponse {
        match &state.status {
            Some(rx) => Json(rx.borrow().clone()).into_response(),
            None => (StatusCode::NOT_FOUND, "NO STATUS").into_response(),
        }
    }
}
