//! Draw Feed Adapters - Upstream Round Data
//!
//! Provides the HTTP polling feed for WinGo 1-minute rounds with
//! failover across the mirrored API domains.

pub mod wingo_http;

pub use wingo_http::{WinGoFeedConfig, WinGoHttpFeed};
