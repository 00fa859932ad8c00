//! Telegram announcer: channel posts and operator reports.
//!
//! Every outbound request waits on a shared `governor` limiter so a
//! burst of effects never trips Telegram's flood control.

use std::num::NonZeroU32;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use teloxide::prelude::*;
use teloxide::types::{InputFile, Recipient};
use tracing::{debug, info};

use super::{recipient, TelegramConfig};
use crate::adapters::notifier::format;
use crate::domain::policy::Channel;
use crate::ports::announcer::{Announcer, BetAnnouncement, RoundReport, WinNotice};

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct TelegramAnnouncer {
    bot: Bot,
    admin: ChatId,
    win_sticker: Option<PathBuf>,
    limiter: Limiter,
}

impl TelegramAnnouncer {
    pub fn new(config: &TelegramConfig) -> Self {
        let per_minute = NonZeroU32::new(config.messages_per_minute).unwrap_or(NonZeroU32::MIN);
        info!(
            admin = config.admin_chat_id,
            per_minute = per_minute.get(),
            "Telegram announcer ready"
        );
        Self {
            bot: Bot::new(&config.bot_token),
            admin: ChatId(config.admin_chat_id),
            win_sticker: config.win_sticker.clone(),
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        }
    }

    async fn send_text(&self, to: Recipient, text: String) -> Result<()> {
        self.limiter.until_ready().await;
        self.bot
            .send_message(to, text)
            .await
            .context("Telegram sendMessage failed")?;
        Ok(())
    }

    async fn sticker_path(&self) -> Option<PathBuf> {
        let path = self.win_sticker.as_ref()?;
        match tokio::fs::try_exists(path).await {
            Ok(true) => Some(path.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl Announcer for TelegramAnnouncer {
    async fn post_bet(&self, bet: &BetAnnouncement) -> Result<()> {
        debug!(channel = %bet.channel.name, period = %bet.period, "Posting bet");
        self.send_text(recipient(&bet.channel.target), format::bet_message(bet))
            .await
    }

    async fn post_win(&self, win: &WinNotice) -> Result<()> {
        let to = recipient(&win.channel.target);
        match self.sticker_path().await {
            Some(path) => {
                self.limiter.until_ready().await;
                self.bot
                    .send_sticker(to, InputFile::file(path))
                    .await
                    .context("Telegram sendSticker failed")?;
                Ok(())
            }
            None => self.send_text(to, format::win_message(win)).await,
        }
    }

    async fn post_bad_series(&self, channel: &Channel, game_name: &str) -> Result<()> {
        self.send_text(recipient(&channel.target), format::bad_series_message(game_name))
            .await
    }

    async fn report_round(&self, report: &RoundReport) -> Result<()> {
        self.send_text(Recipient::Id(self.admin), format::round_report(report))
            .await
    }
}
