//! Crate-level error type for the round pipeline.
//!
//! Adapters return `anyhow::Result`; the use cases wrap those failures
//! into a [`BotError`], log it, count it and carry on with in-memory
//! state. No variant here is fatal to the game loop.

use thiserror::Error;

use crate::domain::draw::DrawError;
use crate::domain::policy::CommandError;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("no draw data available: {0}")]
    DataUnavailable(String),

    #[error("failed to persist {what}: {source}")]
    Persistence {
        what: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("failed to deliver {what}: {source}")]
    Delivery {
        what: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("invalid draw: {0}")]
    InvalidDraw(#[from] DrawError),

    #[error("invalid command: {0}")]
    Command(#[from] CommandError),
}

impl BotError {
    pub fn persistence(what: &'static str, err: anyhow::Error) -> Self {
        Self::Persistence {
            what,
            source: err.into(),
        }
    }

    pub fn delivery(what: &'static str, err: anyhow::Error) -> Self {
        Self::Delivery {
            what,
            source: err.into(),
        }
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataUnavailable(_) => "data_unavailable",
            Self::Persistence { .. } => "persistence",
            Self::Delivery { .. } => "delivery",
            Self::InvalidDraw(_) => "invalid_draw",
            Self::Command(_) => "command",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_keeps_source_chain() {
        let err = BotError::persistence("accuracy", anyhow::anyhow!("disk full"));
        assert_eq!(err.kind(), "persistence");
        assert_eq!(err.to_string(), "failed to persist accuracy: disk full");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_draw_from_domain() {
        let err: BotError = DrawError::OutcomeOutOfRange(12).into();
        assert_eq!(err.kind(), "invalid_draw");
    }
}
