//! Plain-text rendering of announcements and operator reports.

use crate::domain::draw::SizeClass;
use crate::ports::announcer::{BetAnnouncement, RoundReport, WinNotice};

/// Digits of the period shown in posts.
const PERIOD_TAIL: usize = 3;

fn size_upper(size: SizeClass) -> &'static str {
    match size {
        SizeClass::Big => "BIG",
        SizeClass::Small => "SMALL",
    }
}

pub fn bet_message(bet: &BetAnnouncement) -> String {
    format!(
        "{} - ( WINGO 1MIN )\n\nPERIOD NO. - {}\n\nBET - {}",
        bet.game_name,
        bet.period.tail(PERIOD_TAIL),
        size_upper(bet.pick),
    )
}

pub fn win_message(win: &WinNotice) -> String {
    format!(
        "{} WIN\n\nPERIOD NO. - {}\nRESULT - {}\nWINNER WINNER!",
        win.game_name,
        win.period.tail(PERIOD_TAIL),
        size_upper(win.size),
    )
}

pub fn bad_series_message(game_name: &str) -> String {
    format!("{game_name}: rough series, signals paused. Stay tuned.")
}

pub fn round_report(report: &RoundReport) -> String {
    let mut text = format!(
        "{} | {}\n{} | {} ({})\nPred: {} ({:.0}%)\nLogic: {}\nWin rate: {:.1}% over {} bets",
        report.game_name,
        report.status_label,
        report.period.tail(PERIOD_TAIL),
        report.value,
        report.size,
        report.verdict.pick,
        report.verdict.confidence,
        report.verdict.source,
        report.win_rate,
        report.total_bets,
    );
    if report.suspended {
        text.push_str(&format!(
            "\nSUSPENDED after {} losses, send /resume",
            report.consecutive_losses
        ));
    }
    text
}
