//! Posting policy - operator-controlled decision to publish.
//!
//! The policy is a plain value mutated only through [`PolicyCommand`]s.
//! Whether a round may be announced depends on the mode: forced on,
//! forced off, or a daily time window evaluated in a fixed UTC offset
//! (IST, +05:30, by default). Windows whose end lies before their start
//! wrap past midnight.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operator command parsing and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}`")]
    Unknown(String),

    #[error("`{command}` needs an argument: {hint}")]
    MissingArgument {
        command: &'static str,
        hint: &'static str,
    },

    #[error("invalid time window `{0}`, use HH:MM-HH:MM")]
    InvalidWindow(String),

    #[error("no time window set yet, use /window HH:MM-HH:MM first")]
    NoWindowSet,

    #[error("unknown channel `{0}`")]
    UnknownChannel(String),
}

// ────────────────────────────────────────────
// Time window
// ────────────────────────────────────────────

/// Daily `[start, end]` window with minute resolution, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start: truncate_to_minute(start),
            end: truncate_to_minute(end),
        }
    }

    /// Parse `HH:MM-HH:MM`; whitespace around either side is ignored.
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let invalid = || CommandError::InvalidWindow(raw.trim().to_string());
        let (start, end) = raw.split_once('-').ok_or_else(invalid)?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").map_err(|_| invalid())?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").map_err(|_| invalid())?;
        Ok(Self::new(start, end))
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let t = truncate_to_minute(time);
        if self.wraps_midnight() {
            t >= self.start || t <= self.end
        } else {
            self.start <= t && t <= self.end
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

fn truncate_to_minute(t: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t)
}

// ────────────────────────────────────────────
// Commands
// ────────────────────────────────────────────

/// Operator commands with a one-line description each.
pub const COMMAND_HELP: &[(&str, &str)] = &[
    ("on", "Force posting on"),
    ("off", "Force posting off"),
    ("auto", "Post only inside the time window"),
    ("window", "Set the window, e.g. /window 19:00-19:20"),
    ("game", "Set the game name shown in posts"),
    ("channel", "Select the target channel by name"),
    ("resume", "Resume posting after a bad series"),
    ("status", "Show the control panel"),
];

pub fn command_help() -> String {
    COMMAND_HELP
        .iter()
        .map(|(cmd, desc)| format!("/{cmd} - {desc}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCommand {
    ForceOn,
    ForceOff,
    /// Switch back to the last configured window.
    EnableSchedule,
    /// Set a window and switch to it.
    SetWindow(TimeWindow),
    SetGameName(String),
    SelectChannel(String),
    /// Lift a bad-series suspension.
    Resume,
    Status,
}

impl PolicyCommand {
    /// Parse an operator message such as `/window 19:00-19:20`.
    ///
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let text = text.trim();
        let (word, rest) = match text.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (text, ""),
        };
        if word.is_empty() {
            return Err(CommandError::Empty);
        }
        let word = word.split('@').next().unwrap_or(word).to_ascii_lowercase();

        match word.as_str() {
            "/on" | "/force_on" => Ok(Self::ForceOn),
            "/off" | "/force_off" => Ok(Self::ForceOff),
            "/auto" | "/schedule" => Ok(Self::EnableSchedule),
            "/window" | "/time" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "/window",
                        hint: "HH:MM-HH:MM",
                    });
                }
                TimeWindow::parse(rest).map(Self::SetWindow)
            }
            "/game" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "/game",
                        hint: "game name",
                    });
                }
                Ok(Self::SetGameName(rest.to_string()))
            }
            "/channel" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "/channel",
                        hint: "channel name",
                    });
                }
                Ok(Self::SelectChannel(rest.to_string()))
            }
            "/resume" => Ok(Self::Resume),
            "/status" | "/control" => Ok(Self::Status),
            _ => Err(CommandError::Unknown(word)),
        }
    }
}

// ────────────────────────────────────────────
// Policy
// ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingMode {
    ForcedOn,
    ForcedOff,
    TimeWindow(TimeWindow),
}

/// A named announcement target (chat id or `@username`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingStatus {
    pub should_post: bool,
    pub label: String,
}

/// Read-only view published to status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicySnapshot {
    pub should_post: bool,
    pub status_label: String,
    pub game_name: String,
    pub channel: Option<Channel>,
    pub window: Option<String>,
    pub local_time: String,
}

#[derive(Debug, Clone)]
pub struct PostingPolicy {
    mode: PostingMode,
    last_window: Option<TimeWindow>,
    game_name: String,
    channels: Vec<Channel>,
    active_channel: usize,
    utc_offset: FixedOffset,
}

impl PostingPolicy {
    pub fn new(
        mode: PostingMode,
        game_name: &str,
        channels: Vec<Channel>,
        utc_offset: FixedOffset,
    ) -> Self {
        let last_window = match mode {
            PostingMode::TimeWindow(w) => Some(w),
            _ => None,
        };
        Self {
            mode,
            last_window,
            game_name: game_name.trim().to_uppercase(),
            channels,
            active_channel: 0,
            utc_offset,
        }
    }

    /// Remember a window without switching to it.
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.last_window = Some(window);
        self
    }

    pub fn mode(&self) -> PostingMode {
        self.mode
    }

    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    pub fn last_window(&self) -> Option<TimeWindow> {
        self.last_window
    }

    pub fn active_channel(&self) -> Option<&Channel> {
        self.channels.get(self.active_channel)
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveTime {
        now.with_timezone(&self.utc_offset).time()
    }

    pub fn status(&self, now: DateTime<Utc>) -> PostingStatus {
        match self.mode {
            PostingMode::ForcedOn => PostingStatus {
                should_post: true,
                label: "FORCE ON".to_string(),
            },
            PostingMode::ForcedOff => PostingStatus {
                should_post: false,
                label: "FORCE OFF".to_string(),
            },
            PostingMode::TimeWindow(window) => {
                if window.contains(self.local_time(now)) {
                    PostingStatus {
                        should_post: true,
                        label: format!("AUTO ON ({window})"),
                    }
                } else {
                    PostingStatus {
                        should_post: false,
                        label: format!("AUTO OFF (wait: {})", window.start().format("%H:%M")),
                    }
                }
            }
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> PolicySnapshot {
        let status = self.status(now);
        PolicySnapshot {
            should_post: status.should_post,
            status_label: status.label,
            game_name: self.game_name.clone(),
            channel: self.active_channel().cloned(),
            window: self.last_window.map(|w| w.to_string()),
            local_time: self.local_time(now).format("%H:%M:%S").to_string(),
        }
    }

    /// Apply a policy command and return the operator acknowledgement.
    ///
    /// `Resume` and `Status` leave the policy untouched; lifting a
    /// suspension is the posting automaton's business.
    pub fn apply(&mut self, command: &PolicyCommand) -> Result<String, CommandError> {
        match command {
            PolicyCommand::ForceOn => {
                self.mode = PostingMode::ForcedOn;
                Ok("Posting forced ON".to_string())
            }
            PolicyCommand::ForceOff => {
                self.mode = PostingMode::ForcedOff;
                Ok("Posting forced OFF".to_string())
            }
            PolicyCommand::EnableSchedule => {
                let window = self.last_window.ok_or(CommandError::NoWindowSet)?;
                self.mode = PostingMode::TimeWindow(window);
                Ok(format!("Auto schedule ON ({window})"))
            }
            PolicyCommand::SetWindow(window) => {
                self.last_window = Some(*window);
                self.mode = PostingMode::TimeWindow(*window);
                Ok(format!("Time set: {window}"))
            }
            PolicyCommand::SetGameName(name) => {
                let name = name.trim().to_uppercase();
                self.game_name = name.clone();
                Ok(format!("Game name: {name}"))
            }
            PolicyCommand::SelectChannel(name) => {
                let wanted = name.trim();
                let index = self
                    .channels
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| CommandError::UnknownChannel(wanted.to_string()))?;
                self.active_channel = index;
                Ok(format!("Selected: {}", self.channels[index].name))
            }
            PolicyCommand::Resume | PolicyCommand::Status => Ok(String::new()),
        }
    }
}
