//! Config Hot-Reload - Watch config.toml for Changes Every 60s
//!
//! Periodically re-reads config.toml and compares it with the current
//! config. Changes are broadcast on a `tokio::sync::watch` channel, and
//! changes to the `[posting]` section are additionally turned into
//! operator commands so the running policy follows the file without a
//! restart.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use super::{AppConfig, PostingConfig, PostingModeSetting};
use crate::domain::policy::{PolicyCommand, TimeWindow};
use crate::ports::operator::{OperatorRequest, OperatorSender};

/// Watches config.toml for changes and broadcasts updates.
///
/// Polls the config file every 60 seconds rather than using a
/// filesystem watcher. A content hash detects changes.
pub struct ConfigWatcher {
    /// Path to config.toml.
    config_path: String,
    /// Watch channel sender for config updates.
    config_tx: watch::Sender<AppConfig>,
    /// Where posting changes are forwarded, if anywhere.
    operator_tx: Option<OperatorSender>,
    /// Last known content hash.
    last_hash: Option<u64>,
    interval: Duration,
}

impl ConfigWatcher {
    /// Create a new config watcher.
    ///
    /// Returns the watcher and a watch::Receiver that consumers
    /// can use to get notified of config changes.
    pub fn new(
        config_path: &str,
        initial_config: AppConfig,
    ) -> (Self, watch::Receiver<AppConfig>) {
        let (config_tx, config_rx) = watch::channel(initial_config);

        let watcher = Self {
            config_path: config_path.to_string(),
            config_tx,
            operator_tx: None,
            last_hash: None,
            interval: Duration::from_secs(60),
        };

        (watcher, config_rx)
    }

    /// Forward posting-section changes as operator commands.
    pub fn with_operator(mut self, operator_tx: OperatorSender) -> Self {
        self.operator_tx = Some(operator_tx);
        self
    }

    /// Run the config watcher loop until shutdown.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(
        &mut self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        info!(
            path = %self.config_path,
            interval_secs = self.interval.as_secs(),
            "Config watcher started"
        );

        self.last_hash = self.compute_hash().await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Config watcher shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.check_and_reload().await;
                }
            }
        }
    }

    /// Check if config has changed and reload if so.
    async fn check_and_reload(&mut self) {
        let new_hash = self.compute_hash().await;

        if new_hash == self.last_hash {
            debug!("Config unchanged");
            return;
        }

        info!("Config change detected, reloading");

        match super::loader::load_config(&self.config_path) {
            Ok(new_config) => {
                self.last_hash = new_hash;
                let old_posting = self.config_tx.borrow().posting.clone();
                self.forward_posting_changes(&old_posting, &new_config.posting)
                    .await;

                if self.config_tx.send(new_config).is_err() {
                    debug!("No config subscribers");
                }
                info!("Config reloaded successfully");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to reload config, keeping current"
                );
            }
        }
    }

    async fn forward_posting_changes(&self, old: &PostingConfig, new: &PostingConfig) {
        let Some(operator_tx) = &self.operator_tx else {
            return;
        };

        for command in posting_commands(old, new) {
            info!(command = ?command, "Applying posting change from config");
            if operator_tx.send(OperatorRequest::new(command)).await.is_err() {
                warn!("Game loop gone, posting change dropped");
                return;
            }
        }
    }

    /// Hash of the config file contents for diff detection.
    async fn compute_hash(&self) -> Option<u64> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let content = tokio::fs::read_to_string(&self.config_path)
            .await
            .ok()?;

        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        Some(hasher.finish())
    }
}

/// Commands that move a running policy from `old` to `new`.
///
/// A new window is applied first because setting a window also switches
/// to it; the mode command that follows restores forced modes.
pub fn posting_commands(old: &PostingConfig, new: &PostingConfig) -> Vec<PolicyCommand> {
    let mut commands = Vec::new();

    let new_window = new
        .window
        .as_deref()
        .and_then(|w| TimeWindow::parse(w).ok());
    let window_changed = old.window != new.window && new_window.is_some();
    if let Some(window) = new_window.filter(|_| window_changed) {
        commands.push(PolicyCommand::SetWindow(window));
    }

    let mode_changed = old.mode != new.mode;
    if mode_changed || window_changed {
        let command = match new.mode {
            PostingModeSetting::On => Some(PolicyCommand::ForceOn),
            PostingModeSetting::Off => Some(PolicyCommand::ForceOff),
            // SetWindow already switched to the schedule
            PostingModeSetting::Schedule if window_changed => None,
            PostingModeSetting::Schedule => Some(PolicyCommand::EnableSchedule),
        };
        commands.extend(command);
    }

    if !old.game_name.trim().eq_ignore_ascii_case(new.game_name.trim()) {
        commands.push(PolicyCommand::SetGameName(new.game_name.clone()));
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(mode: PostingModeSetting, window: Option<&str>, game: &str) -> PostingConfig {
        PostingConfig {
            mode,
            window: window.map(str::to_string),
            game_name: game.to_string(),
            ..PostingConfig::default()
        }
    }

    #[test]
    fn test_unchanged_posting_yields_nothing() {
        let p = posting(PostingModeSetting::On, Some("19:00-19:20"), "BDG");
        assert!(posting_commands(&p, &p.clone()).is_empty());
    }

    #[test]
    fn test_mode_change() {
        let old = posting(PostingModeSetting::Off, Some("19:00-19:20"), "BDG");
        let new = posting(PostingModeSetting::Schedule, Some("19:00-19:20"), "BDG");
        assert_eq!(posting_commands(&old, &new), vec![PolicyCommand::EnableSchedule]);
    }

    #[test]
    fn test_window_change_keeps_forced_mode() {
        let old = posting(PostingModeSetting::On, Some("19:00-19:20"), "BDG");
        let new = posting(PostingModeSetting::On, Some("20:00-20:30"), "BDG");
        let window = TimeWindow::parse("20:00-20:30").unwrap();
        assert_eq!(
            posting_commands(&old, &new),
            vec![PolicyCommand::SetWindow(window), PolicyCommand::ForceOn]
        );
    }

    #[test]
    fn test_window_change_in_schedule_mode() {
        let old = posting(PostingModeSetting::Schedule, Some("19:00-19:20"), "BDG");
        let new = posting(PostingModeSetting::Schedule, Some("22:00-01:00"), "bdg");
        let window = TimeWindow::parse("22:00-01:00").unwrap();
        assert_eq!(posting_commands(&old, &new), vec![PolicyCommand::SetWindow(window)]);
    }

    #[test]
    fn test_game_name_change() {
        let old = posting(PostingModeSetting::Off, None, "BDG");
        let new = posting(PostingModeSetting::Off, None, "TC");
        assert_eq!(
            posting_commands(&old, &new),
            vec![PolicyCommand::SetGameName("TC".to_string())]
        );
    }

    #[tokio::test]
    async fn test_reload_forwards_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bot]\nname = \"t\"\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let initial = super::super::loader::load_config(&path).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let (watcher, config_rx) = ConfigWatcher::new(&path, initial);
        let mut watcher = watcher.with_operator(tx);

        std::fs::write(&path, "[bot]\nname = \"t\"\n[posting]\nmode = \"on\"\n").unwrap();
        watcher.check_and_reload().await;

        let request = rx.try_recv().unwrap();
        assert_eq!(request.command, PolicyCommand::ForceOn);
        assert_eq!(config_rx.borrow().posting.mode, PostingModeSetting::On);
    }
}
