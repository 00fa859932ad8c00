//! Notifier Adapters - Announcer Implementations
//!
//! - `telegram`: channel posts, operator reports and commands via the
//!   Telegram Bot API (requires the `telegram` feature)
//! - `log_announcer`: dry-run sink writing messages to the log

pub mod format;
pub mod log_announcer;
#[cfg(feature = "telegram")]
pub mod telegram;

pub use log_announcer::LogAnnouncer;
#[cfg(feature = "telegram")]
pub use telegram::{TelegramAnnouncer, TelegramCommandListener, TelegramConfig};
