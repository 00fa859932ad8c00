//! Telegram command listener.
//!
//! Only messages from the admin chat are considered. Each recognised
//! command is forwarded to the game loop and the listener relays the
//! acknowledgement back to the chat.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::TelegramConfig;
use crate::domain::policy::{command_help, PolicyCommand, COMMAND_HELP};
use crate::ports::operator::{OperatorRequest, OperatorSender};

pub struct TelegramCommandListener {
    bot: Bot,
    admin: ChatId,
    commands: OperatorSender,
    reply_timeout: Duration,
}

impl TelegramCommandListener {
    pub fn new(config: &TelegramConfig, commands: OperatorSender) -> Self {
        Self {
            bot: Bot::new(&config.bot_token),
            admin: ChatId(config.admin_chat_id),
            commands,
            reply_timeout: config.reply_timeout,
        }
    }

    /// Listen for commands until shutdown.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        if let Err(e) = register_bot_commands(&self.bot).await {
            warn!(error = %e, "Failed to register bot commands with Telegram");
        }

        info!(admin = self.admin.0, "Telegram command listener started");

        let admin = self.admin;
        let commands = self.commands;
        let reply_timeout = self.reply_timeout;

        let repl = teloxide::repl(self.bot, move |bot: Bot, msg: Message| {
            let commands = commands.clone();
            async move {
                let Some(text) = msg.text() else {
                    return respond(());
                };
                if msg.chat.id != admin {
                    warn!(chat_id = msg.chat.id.0, "Ignoring Telegram message from unauthorized chat");
                    return respond(());
                }
                if let Some(response) = handle_text(text, &commands, reply_timeout).await {
                    if let Err(e) = bot.send_message(msg.chat.id, response).await {
                        error!(error = %e, "Failed to send Telegram command response");
                    }
                }
                respond(())
            }
        });

        tokio::select! {
            _ = repl => warn!("Telegram command listener stopped"),
            _ = shutdown_rx.recv() => info!("Telegram command listener shutting down"),
        }
    }
}

/// Forward a command and wait for the acknowledgement.
///
/// Plain text (not starting with `/`) is ignored.
async fn handle_text(text: &str, commands: &OperatorSender, timeout: Duration) -> Option<String> {
    if !text.trim_start().starts_with('/') {
        return None;
    }

    let command = match PolicyCommand::parse(text) {
        Ok(command) => command,
        Err(e) => return Some(format!("Invalid command: {e}\n\n{}", command_help())),
    };

    let (request, reply) = OperatorRequest::with_reply(command);
    if commands.send(request).await.is_err() {
        return Some("Bot is shutting down".to_string());
    }

    match tokio::time::timeout(timeout, reply).await {
        Ok(Ok(ack)) => Some(ack),
        Ok(Err(_)) => Some("Command dropped".to_string()),
        Err(_) => Some("Command queued, no acknowledgement yet".to_string()),
    }
}

/// Register bot commands with Telegram for the "/" menu.
async fn register_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands: Vec<BotCommand> = COMMAND_HELP
        .iter()
        .map(|(cmd, desc)| BotCommand::new(*cmd, *desc))
        .collect();

    bot.set_my_commands(commands).await?;
    info!("Registered bot commands with Telegram");
    Ok(())
}
