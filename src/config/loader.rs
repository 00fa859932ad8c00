//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{AppConfig, PostingModeSetting};

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    bot = %config.bot.name,
    domains = config.feed.domains.len(),
    mode = ?config.posting.mode,
    dry_run = config.bot.dry_run,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Feed validation
  anyhow::ensure!(
    !config.feed.domains.is_empty(),
    "At least one feed domain must be configured"
  );
  for domain in &config.feed.domains {
    anyhow::ensure!(
      domain.starts_with("http://") || domain.starts_with("https://"),
      "Feed domain `{}` must be an http(s) URL",
      domain
    );
  }
  anyhow::ensure!(
    config.feed.page_size > 0,
    "feed.page_size must be positive"
  );
  anyhow::ensure!(
    config.feed.poll_interval_seconds > 0,
    "feed.poll_interval_seconds must be positive"
  );
  anyhow::ensure!(
    config.feed.poll_timeout_seconds > 0 && config.feed.warm_up_timeout_seconds > 0,
    "Feed timeouts must be positive"
  );

  // History validation
  anyhow::ensure!(
    config.history.max_records > 0,
    "history.max_records must be positive"
  );

  // Strategy validation
  let s = &config.strategies;
  for (name, value) in [
    ("pattern_gate", s.pattern_gate),
    ("fallback_confidence", s.fallback_confidence),
    ("max_confidence", s.max_confidence),
  ] {
    anyhow::ensure!(
      (0.0..=100.0).contains(&value),
      "strategies.{} must be in [0, 100], got {}",
      name,
      value
    );
  }
  anyhow::ensure!(
    s.pattern_len > 0 && s.classifier_lags > 0,
    "pattern_len and classifier_lags must be positive"
  );
  anyhow::ensure!(
    s.n_estimators > 0 && s.learning_rate > 0.0 && s.max_depth > 0,
    "Classifier parameters must be positive"
  );

  // Posting validation
  let p = &config.posting;
  anyhow::ensure!(
    p.loss_limit > 0,
    "posting.loss_limit must be positive"
  );
  anyhow::ensure!(
    !p.game_name.trim().is_empty(),
    "posting.game_name must not be empty"
  );
  anyhow::ensure!(
    !p.channels.is_empty(),
    "At least one channel must be configured"
  );
  for (i, channel) in p.channels.iter().enumerate() {
    anyhow::ensure!(
      !channel.name.trim().is_empty(),
      "Channel {} has an empty name",
      i
    );
  }
  p.utc_offset()?;
  let window = p.parsed_window()?;
  anyhow::ensure!(
    p.mode != PostingModeSetting::Schedule || window.is_some(),
    "posting.mode = \"schedule\" requires posting.window"
  );

  // Telegram validation
  anyhow::ensure!(
    config.telegram.messages_per_minute > 0,
    "telegram.messages_per_minute must be positive"
  );

  Ok(())
}
