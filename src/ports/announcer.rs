//! Announcer Port - Channel Posts and Operator Reports
//!
//! Plain, functional text only. Implementations decide how a message
//! is rendered and delivered; the core never retries a failed post.

use async_trait::async_trait;

use crate::domain::draw::{Period, SizeClass};
use crate::domain::policy::Channel;
use crate::domain::prediction::{Source, Verdict};

/// A new bet for the upcoming period.
#[derive(Debug, Clone, PartialEq)]
pub struct BetAnnouncement {
  pub channel: Channel,
  pub game_name: String,
  /// Target period of the bet.
  pub period: Period,
  pub pick: SizeClass,
  pub confidence: f64,
  pub source: Source,
}

/// The armed bet for `period` hit.
#[derive(Debug, Clone, PartialEq)]
pub struct WinNotice {
  pub channel: Channel,
  pub game_name: String,
  pub period: Period,
  pub value: u8,
  pub size: SizeClass,
}

/// Per-round summary for the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
  pub game_name: String,
  pub status_label: String,
  pub period: Period,
  pub value: u8,
  pub size: SizeClass,
  pub verdict: Verdict,
  /// Win rate in percent, one decimal.
  pub win_rate: f64,
  pub total_bets: u64,
  pub consecutive_losses: u32,
  pub suspended: bool,
}

/// Trait for announcement sinks (Telegram, log-only dry run).
#[async_trait]
pub trait Announcer: Send + Sync + 'static {
  /// Publish the next bet to the active channel.
  async fn post_bet(&self, bet: &BetAnnouncement) -> anyhow::Result<()>;

  /// Publish a win for the armed bet.
  async fn post_win(&self, win: &WinNotice) -> anyhow::Result<()>;

  /// Publish the bad-series notice that precedes a suspension.
  async fn post_bad_series(&self, channel: &Channel, game_name: &str) -> anyhow::Result<()>;

  /// Send the per-round summary to the operator.
  async fn report_round(&self, report: &RoundReport) -> anyhow::Result<()>;
}
