//! Policy Controller - Operator Commands and Policy Snapshots
//!
//! Owns the [`PostingPolicy`]. Commands are applied one at a time by the
//! game loop between polls; after each one a fresh [`PolicySnapshot`] is
//! published on a watch channel; the health server serves it on `/status`.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::policy::{
  command_help, CommandError, PolicyCommand, PolicySnapshot, PostingPolicy, PostingStatus,
};

pub struct PolicyController {
  policy: PostingPolicy,
  snapshot_tx: watch::Sender<PolicySnapshot>,
}

impl PolicyController {
  pub fn new(policy: PostingPolicy, now: DateTime<Utc>) -> (Self, watch::Receiver<PolicySnapshot>) {
    let (snapshot_tx, snapshot_rx) = watch::channel(policy.snapshot(now));
    (
      Self {
        policy,
        snapshot_tx,
      },
      snapshot_rx,
    )
  }

  pub fn policy(&self) -> &PostingPolicy {
    &self.policy
  }

  pub fn status(&self, now: DateTime<Utc>) -> PostingStatus {
    self.policy.status(now)
  }

  /// Apply a policy-level command and publish the new snapshot.
  pub fn apply(
    &mut self,
    command: &PolicyCommand,
    now: DateTime<Utc>,
  ) -> Result<String, CommandError> {
    match self.policy.apply(command) {
      Ok(ack) => {
        info!(command = ?command, ack = %ack, "Policy command applied");
        self.publish(now);
        Ok(ack)
      }
      Err(e) => {
        warn!(command = ?command, error = %e, "Policy command rejected");
        Err(e)
      }
    }
  }

  /// Refresh the published snapshot (the window status moves with time).
  pub fn publish(&self, now: DateTime<Utc>) {
    self.snapshot_tx.send_replace(self.policy.snapshot(now));
  }

  /// Operator control panel; `extra` lines are appended before the help.
  pub fn panel(&self, now: DateTime<Utc>, extra: &[String]) -> String {
    let snap = self.policy.snapshot(now);
    let channel = snap
      .channel
      .as_ref()
      .map(|c| format!("{} ({})", c.name, c.target))
      .unwrap_or_else(|| "none".to_string());

    let mut lines = vec![
      "CONTROL PANEL".to_string(),
      format!("Status: {}", snap.status_label),
      format!("Game: {}", snap.game_name),
      format!("Channel: {channel}"),
      format!("Window: {}", snap.window.as_deref().unwrap_or("not set")),
      format!("Time: {}", snap.local_time),
    ];
    lines.extend(extra.iter().cloned());
    lines.push(String::new());
    lines.push(command_help());
    lines.join("\n")
  }
}
