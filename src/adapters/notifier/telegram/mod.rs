//! Telegram adapters.
//!
//! Requires the `telegram` feature to be enabled.

mod announcer;
mod commands;

pub use announcer::TelegramAnnouncer;
pub use commands::TelegramCommandListener;

use std::path::PathBuf;
use std::time::Duration;

use teloxide::types::{ChatId, Recipient};

/// Configuration shared by the announcer and the command listener.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token obtained from BotFather.
    pub bot_token: String,
    /// The only chat allowed to send commands; also receives round reports.
    pub admin_chat_id: i64,
    /// Sticker sent instead of the text win message, if the file exists.
    pub win_sticker: Option<PathBuf>,
    /// Outbound message budget.
    pub messages_per_minute: u32,
    /// How long a command waits for the game loop to acknowledge it.
    pub reply_timeout: Duration,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, admin_chat_id: i64) -> Self {
        Self {
            bot_token: bot_token.into(),
            admin_chat_id,
            win_sticker: None,
            messages_per_minute: 20,
            reply_timeout: Duration::from_secs(15),
        }
    }
}

/// Numeric targets are chat ids, anything else a channel username.
pub(crate) fn recipient(target: &str) -> Recipient {
    let target = target.trim();
    match target.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if target.starts_with('@') => Recipient::ChannelUsername(target.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{target}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_parsing() {
        assert_eq!(recipient("-1001234"), Recipient::Id(ChatId(-1001234)));
        assert_eq!(
            recipient("@wingo_main"),
            Recipient::ChannelUsername("@wingo_main".to_string())
        );
        assert_eq!(
            recipient(" wingo_vip "),
            Recipient::ChannelUsername("@wingo_vip".to_string())
        );
    }
}
