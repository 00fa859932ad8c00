//! Operator Port - Commands into the Game Loop
//!
//! Command sources (Telegram listener, config watcher) send
//! `OperatorRequest`s over an mpsc channel. The game loop applies them
//! between polls and answers on the optional oneshot.

use tokio::sync::{mpsc, oneshot};

use crate::domain::policy::PolicyCommand;

/// A command plus an optional reply slot for the acknowledgement.
#[derive(Debug)]
pub struct OperatorRequest {
  pub command: PolicyCommand,
  pub reply: Option<oneshot::Sender<String>>,
}

impl OperatorRequest {
  /// Fire-and-forget request.
  pub fn new(command: PolicyCommand) -> Self {
    Self {
      command,
      reply: None,
    }
  }

  /// Request with a reply channel; the receiver gets the acknowledgement.
  pub fn with_reply(command: PolicyCommand) -> (Self, oneshot::Receiver<String>) {
    let (tx, rx) = oneshot::channel();
    (
      Self {
        command,
        reply: Some(tx),
      },
      rx,
    )
  }
}

pub type OperatorSender = mpsc::Sender<OperatorRequest>;
pub type OperatorReceiver = mpsc::Receiver<OperatorRequest>;
