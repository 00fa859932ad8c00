//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP client, Telegram, file I/O). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `feeds`: WinGo draw history over HTTPS
//! - `metrics`: Prometheus metrics export and health checks
//! - `notifier`: Telegram announcer/commands and the dry-run logger
//! - `persistence`: JSON snapshots and the JSONL bet journal

pub mod feeds;
pub mod metrics;
pub mod notifier;
pub mod persistence;
