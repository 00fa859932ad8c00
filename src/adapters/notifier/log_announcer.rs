//! Log-only announcer for dry runs.
//!
//! Renders every message exactly as it would be posted and writes it
//! to the tracing output instead of a chat.

use async_trait::async_trait;
use tracing::info;

use super::format;
use crate::domain::policy::Channel;
use crate::ports::announcer::{Announcer, BetAnnouncement, RoundReport, WinNotice};

#[derive(Debug, Default, Clone)]
pub struct LogAnnouncer;

#[async_trait]
impl Announcer for LogAnnouncer {
    async fn post_bet(&self, bet: &BetAnnouncement) -> anyhow::Result<()> {
        info!(channel = %bet.channel.name, period = %bet.period, text = %format::bet_message(bet), "[dry-run] bet");
        Ok(())
    }

    async fn post_win(&self, win: &WinNotice) -> anyhow::Result<()> {
        info!(channel = %win.channel.name, period = %win.period, text = %format::win_message(win), "[dry-run] win");
        Ok(())
    }

    async fn post_bad_series(&self, channel: &Channel, game_name: &str) -> anyhow::Result<()> {
        info!(channel = %channel.name, text = %format::bad_series_message(game_name), "[dry-run] bad series");
        Ok(())
    }

    async fn report_round(&self, report: &RoundReport) -> anyhow::Result<()> {
        info!(period = %report.period, text = %format::round_report(report), "[dry-run] round report");
        Ok(())
    }
}
