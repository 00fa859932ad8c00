//! Draw Feed Port - Resolved Round Source
//!
//! The upstream game publishes a paged history of resolved rounds,
//! newest first. The core only needs the latest round while running
//! and older pages once at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::draw::{DrawError, DrawRecord, Period};

/// A draw exactly as the feed reported it, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDraw {
  /// Period identifier (digit string).
  pub period: String,
  /// Outcome value; expected in 0..=9.
  pub number: i64,
}

impl RawDraw {
  pub fn new(period: impl Into<String>, number: i64) -> Self {
    Self {
      period: period.into(),
      number,
    }
  }

  /// Validate into a domain record observed at `observed_at`.
  pub fn into_record(self, observed_at: DateTime<Utc>) -> Result<DrawRecord, DrawError> {
    DrawRecord::new(Period::parse(&self.period)?, self.number, observed_at)
  }
}

/// Trait for draw feed providers.
///
/// Implementations should treat transport failures as errors and an
/// empty but well-formed response as `Ok(None)` / an empty page.
#[async_trait]
pub trait DrawFeed: Send + Sync + 'static {
  /// The most recently resolved draw, if the feed has one.
  async fn latest(&self) -> anyhow::Result<Option<RawDraw>>;

  /// One history page (1-based), newest first.
  async fn history_page(&self, page: u32) -> anyhow::Result<Vec<RawDraw>>;

  /// Check if the last request succeeded.
  async fn is_healthy(&self) -> bool;
}
