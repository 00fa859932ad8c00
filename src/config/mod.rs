//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml`. Secrets (the
//! bot token) and deployment-specific chat ids come from the
//! environment, optionally through a `.env` file.
//! Feed endpoints, strategy thresholds and posting defaults are all
//! externalized here; the domain layer only sees typed values.

pub mod hot_reload;
pub mod loader;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::adapters::feeds::WinGoFeedConfig;
use crate::domain::arbiter::Arbiter;
use crate::domain::gbm::BoostingParams;
use crate::domain::policy::{Channel, PostingMode, PostingPolicy, TimeWindow};
use crate::domain::strategy::{LaggedClassifier, PatternFrequency, StreakRule};

/// Top-level bot configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the bot begins operation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
  /// Bot identity and metadata.
  pub bot: BotConfig,
  /// Upstream draw feed.
  #[serde(default)]
  pub feed: FeedConfig,
  /// Outcome store limits.
  #[serde(default)]
  pub history: HistoryConfig,
  /// Strategy and arbitration thresholds.
  #[serde(default)]
  pub strategies: StrategyConfig,
  /// Posting policy defaults and channels.
  #[serde(default)]
  pub posting: PostingConfig,
  /// Telegram delivery.
  #[serde(default)]
  pub telegram: TelegramSettings,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Log announcements instead of sending them.
  #[serde(default)]
  pub dry_run: bool,
}

/// Draw feed configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
  /// Mirror base URLs, tried in order.
  #[serde(default = "default_domains")]
  pub domains: Vec<String>,
  /// Endpoint path on every domain.
  #[serde(default = "default_api_path")]
  pub api_path: String,
  /// Rows per history page.
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Site sent as Referer/Origin.
  #[serde(default = "default_site_origin")]
  pub site_origin: String,
  #[serde(default = "default_user_agent")]
  pub user_agent: String,
  /// Live poll timeout (seconds).
  #[serde(default = "default_poll_timeout")]
  pub poll_timeout_seconds: u64,
  /// Sleep between polls (seconds).
  #[serde(default = "default_poll_interval")]
  pub poll_interval_seconds: u64,
  /// Sleep after a poll without data (seconds).
  #[serde(default = "default_idle_interval")]
  pub idle_interval_seconds: u64,
  /// History pages fetched at startup.
  #[serde(default = "default_warm_up_pages")]
  pub warm_up_pages: u32,
  /// Timeout per warm-up page (seconds).
  #[serde(default = "default_warm_up_timeout")]
  pub warm_up_timeout_seconds: u64,
}

/// Outcome store configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryConfig {
  /// Records kept; the oldest are evicted beyond this.
  #[serde(default = "default_max_records")]
  pub max_records: usize,
}

/// Strategy thresholds and classifier parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StrategyConfig {
  #[serde(default = "default_streak_min_history")]
  pub streak_min_history: usize,
  #[serde(default = "default_pattern_min_history")]
  pub pattern_min_history: usize,
  #[serde(default = "default_pattern_len")]
  pub pattern_len: usize,
  /// How far back pattern matches are searched.
  #[serde(default = "default_pattern_search_window")]
  pub pattern_search_window: usize,
  /// Pattern opinions need strictly more confidence than this.
  #[serde(default = "default_pattern_gate")]
  pub pattern_gate: f64,
  #[serde(default = "default_classifier_min_history")]
  pub classifier_min_history: usize,
  #[serde(default = "default_classifier_lags")]
  pub classifier_lags: usize,
  #[serde(default = "default_n_estimators")]
  pub n_estimators: usize,
  #[serde(default = "default_learning_rate")]
  pub learning_rate: f64,
  #[serde(default = "default_max_depth")]
  pub max_depth: usize,
  /// Confidence of the blind-trend fallback.
  #[serde(default = "default_fallback_confidence")]
  pub fallback_confidence: f64,
  /// Upper bound on any verdict's confidence.
  #[serde(default = "default_max_confidence")]
  pub max_confidence: f64,
}

/// Initial posting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingModeSetting {
  On,
  Off,
  Schedule,
}

/// Announcement target; `target_env` wins over `target` when set.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChannelConfig {
  pub name: String,
  #[serde(default)]
  pub target: String,
  #[serde(default)]
  pub target_env: Option<String>,
}

/// Posting policy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PostingConfig {
  #[serde(default = "default_mode")]
  pub mode: PostingModeSetting,
  /// Daily window `HH:MM-HH:MM`, required for `schedule`.
  #[serde(default)]
  pub window: Option<String>,
  #[serde(default = "default_game_name")]
  pub game_name: String,
  /// Offset of the window's clock from UTC (IST = 330).
  #[serde(default = "default_utc_offset")]
  pub utc_offset_minutes: i32,
  /// Consecutive losses before posting is suspended.
  #[serde(default = "default_loss_limit")]
  pub loss_limit: u32,
  /// First entry is the initial target.
  #[serde(default = "default_channels")]
  pub channels: Vec<ChannelConfig>,
}

/// Telegram configuration (the token itself is read from the environment).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TelegramSettings {
  /// Environment variable holding the bot token.
  #[serde(default = "default_token_env")]
  pub token_env: String,
  /// Operator chat id; falls back to `admin_chat_id_env`.
  #[serde(default)]
  pub admin_chat_id: Option<i64>,
  #[serde(default = "default_admin_env")]
  pub admin_chat_id_env: String,
  /// Sticker file sent for wins when present.
  #[serde(default = "default_win_sticker")]
  pub win_sticker: Option<String>,
  #[serde(default = "default_messages_per_minute")]
  pub messages_per_minute: u32,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PersistenceConfig {
  /// Directory for snapshots and the bet journal.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

// ────────────────────────────────────────────
// Conversions into runtime types
// ────────────────────────────────────────────

impl FeedConfig {
  pub fn to_feed_config(&self) -> WinGoFeedConfig {
    WinGoFeedConfig {
      domains: self.domains.clone(),
      api_path: self.api_path.clone(),
      page_size: self.page_size,
      poll_timeout: Duration::from_secs(self.poll_timeout_seconds),
      history_timeout: Duration::from_secs(self.warm_up_timeout_seconds),
      site_origin: self.site_origin.clone(),
      user_agent: self.user_agent.clone(),
    }
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_seconds)
  }

  pub fn idle_interval(&self) -> Duration {
    Duration::from_secs(self.idle_interval_seconds)
  }
}

impl StrategyConfig {
  /// Streak rules, gated pattern frequency, lagged classifier, fallback.
  pub fn build_arbiter(&self) -> Arbiter {
    let params = BoostingParams {
      n_estimators: self.n_estimators,
      learning_rate: self.learning_rate,
      max_depth: self.max_depth,
      ..BoostingParams::default()
    };
    Arbiter::standard(
      StreakRule::new(self.streak_min_history),
      PatternFrequency::new(
        self.pattern_min_history,
        self.pattern_len,
        self.pattern_search_window,
      ),
      self.pattern_gate,
      LaggedClassifier::new(self.classifier_min_history, self.classifier_lags, params),
      self.fallback_confidence,
      self.max_confidence,
    )
  }
}

impl PostingConfig {
  pub fn utc_offset(&self) -> Result<FixedOffset> {
    FixedOffset::east_opt(self.utc_offset_minutes * 60)
      .with_context(|| format!("utc_offset_minutes {} out of range", self.utc_offset_minutes))
  }

  pub fn parsed_window(&self) -> Result<Option<TimeWindow>> {
    self
      .window
      .as_deref()
      .map(|w| TimeWindow::parse(w).with_context(|| format!("Invalid posting.window `{w}`")))
      .transpose()
  }

  /// Resolve channel targets, reading `target_env` where set.
  pub fn resolved_channels(&self) -> Vec<Channel> {
    self
      .channels
      .iter()
      .map(|c| {
        let from_env = c
          .target_env
          .as_deref()
          .and_then(|var| std::env::var(var).ok())
          .filter(|v| !v.trim().is_empty());
        Channel {
          name: c.name.clone(),
          target: from_env.unwrap_or_else(|| c.target.clone()),
        }
      })
      .collect()
  }

  pub fn build_policy(&self) -> Result<PostingPolicy> {
    let window = self.parsed_window()?;
    let mode = match self.mode {
      PostingModeSetting::On => PostingMode::ForcedOn,
      PostingModeSetting::Off => PostingMode::ForcedOff,
      PostingModeSetting::Schedule => PostingMode::TimeWindow(
        window.context("posting.mode = \"schedule\" requires posting.window")?,
      ),
    };

    let mut policy =
      PostingPolicy::new(mode, &self.game_name, self.resolved_channels(), self.utc_offset()?);
    if let Some(w) = window {
      policy = policy.with_window(w);
    }
    Ok(policy)
  }
}

// Default impls for optional sections

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      domains: default_domains(),
      api_path: default_api_path(),
      page_size: default_page_size(),
      site_origin: default_site_origin(),
      user_agent: default_user_agent(),
      poll_timeout_seconds: default_poll_timeout(),
      poll_interval_seconds: default_poll_interval(),
      idle_interval_seconds: default_idle_interval(),
      warm_up_pages: default_warm_up_pages(),
      warm_up_timeout_seconds: default_warm_up_timeout(),
    }
  }
}

impl Default for HistoryConfig {
  fn default() -> Self {
    Self {
      max_records: default_max_records(),
    }
  }
}

impl Default for StrategyConfig {
  fn default() -> Self {
    Self {
      streak_min_history: default_streak_min_history(),
      pattern_min_history: default_pattern_min_history(),
      pattern_len: default_pattern_len(),
      pattern_search_window: default_pattern_search_window(),
      pattern_gate: default_pattern_gate(),
      classifier_min_history: default_classifier_min_history(),
      classifier_lags: default_classifier_lags(),
      n_estimators: default_n_estimators(),
      learning_rate: default_learning_rate(),
      max_depth: default_max_depth(),
      fallback_confidence: default_fallback_confidence(),
      max_confidence: default_max_confidence(),
    }
  }
}

impl Default for PostingConfig {
  fn default() -> Self {
    Self {
      mode: default_mode(),
      window: None,
      game_name: default_game_name(),
      utc_offset_minutes: default_utc_offset(),
      loss_limit: default_loss_limit(),
      channels: default_channels(),
    }
  }
}

impl Default for TelegramSettings {
  fn default() -> Self {
    Self {
      token_env: default_token_env(),
      admin_chat_id: None,
      admin_chat_id_env: default_admin_env(),
      win_sticker: default_win_sticker(),
      messages_per_minute: default_messages_per_minute(),
    }
  }
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: default_true(),
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_domains() -> Vec<String> {
  WinGoFeedConfig::default().domains
}

fn default_api_path() -> String {
  WinGoFeedConfig::default().api_path
}

fn default_page_size() -> u32 {
  10
}

fn default_site_origin() -> String {
  WinGoFeedConfig::default().site_origin
}

fn default_user_agent() -> String {
  WinGoFeedConfig::default().user_agent
}

fn default_poll_timeout() -> u64 {
  5
}

fn default_poll_interval() -> u64 {
  5
}

fn default_idle_interval() -> u64 {
  2
}

fn default_warm_up_pages() -> u32 {
  100
}

fn default_warm_up_timeout() -> u64 {
  3
}

fn default_max_records() -> usize {
  2000
}

fn default_streak_min_history() -> usize {
  5
}

fn default_pattern_min_history() -> usize {
  10
}

fn default_pattern_len() -> usize {
  3
}

fn default_pattern_search_window() -> usize {
  500
}

fn default_pattern_gate() -> f64 {
  55.0
}

fn default_classifier_min_history() -> usize {
  20
}

fn default_classifier_lags() -> usize {
  3
}

fn default_n_estimators() -> usize {
  50
}

fn default_learning_rate() -> f64 {
  0.2
}

fn default_max_depth() -> usize {
  2
}

fn default_fallback_confidence() -> f64 {
  51.0
}

fn default_max_confidence() -> f64 {
  99.0
}

fn default_mode() -> PostingModeSetting {
  PostingModeSetting::Off
}

fn default_game_name() -> String {
  "BDG".to_string()
}

fn default_utc_offset() -> i32 {
  330
}

fn default_loss_limit() -> u32 {
  4
}

fn default_channels() -> Vec<ChannelConfig> {
  [("MAIN", "MAIN_CHANNEL"), ("VIP", "VIP_CHANNEL"), ("TEST", "TEST_CHANNEL")]
    .into_iter()
    .map(|(name, var)| ChannelConfig {
      name: name.to_string(),
      target: String::new(),
      target_env: Some(var.to_string()),
    })
    .collect()
}

fn default_token_env() -> String {
  "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_admin_env() -> String {
  "ADMIN_ID".to_string()
}

fn default_win_sticker() -> Option<String> {
  Some("win.webp".to_string())
}

fn default_messages_per_minute() -> u32 {
  20
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}

fn default_data_dir() -> String {
  "data".to_string()
}
