//! Prediction types shared by the strategies and the arbiter.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::draw::SizeClass;

/// Which heuristic produced an opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    StreakRule,
    PatternFrequency,
    LaggedClassifier,
    /// Terminal fallback: repeat the size of the round that just resolved.
    BlindTrend,
}

impl Source {
    /// Human label used in announcements and operator reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::StreakRule => "Streak",
            Self::PatternFrequency => "History-Pattern",
            Self::LaggedClassifier => "AI-Prediction",
            Self::BlindTrend => "Blind-Trend",
        }
    }

    /// Stable lowercase id for metric labels.
    pub fn metric_id(self) -> &'static str {
        match self {
            Self::StreakRule => "streak",
            Self::PatternFrequency => "pattern",
            Self::LaggedClassifier => "classifier",
            Self::BlindTrend => "blind_trend",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a strategy declined to give an opinion.
#[derive(Debug, Clone, PartialEq)]
pub enum Abstain {
    InsufficientHistory { have: usize, need: usize },
    NoMatch,
    Tie,
    TrainingFailure(String),
}

impl fmt::Display for Abstain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientHistory { have, need } => {
                write!(f, "insufficient history ({have}/{need})")
            }
            Self::NoMatch => write!(f, "no matching pattern"),
            Self::Tie => write!(f, "tied outcome counts"),
            Self::TrainingFailure(reason) => write!(f, "training failed: {reason}"),
        }
    }
}

/// Either a pick with a confidence in percent, or an abstention.
#[derive(Debug, Clone, PartialEq)]
pub enum Opinion {
    Pick { size: SizeClass, confidence: f64 },
    Abstain(Abstain),
}

/// A single strategy's output for the upcoming round.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub source: Source,
    pub opinion: Opinion,
}

impl Prediction {
    pub fn pick(source: Source, size: SizeClass, confidence: f64) -> Self {
        Self {
            source,
            opinion: Opinion::Pick {
                size,
                confidence: confidence.clamp(0.0, 100.0),
            },
        }
    }

    pub fn abstain(source: Source, reason: Abstain) -> Self {
        Self {
            source,
            opinion: Opinion::Abstain(reason),
        }
    }

    /// `None` means "no opinion".
    pub fn size_class(&self) -> Option<SizeClass> {
        match self.opinion {
            Opinion::Pick { size, .. } => Some(size),
            Opinion::Abstain(_) => None,
        }
    }

    /// Zero when abstaining.
    pub fn confidence(&self) -> f64 {
        match self.opinion {
            Opinion::Pick { confidence, .. } => confidence,
            Opinion::Abstain(_) => 0.0,
        }
    }

    pub fn is_opinion(&self) -> bool {
        matches!(self.opinion, Opinion::Pick { .. })
    }
}

/// The arbiter's final call. Always concrete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub pick: SizeClass,
    pub confidence: f64,
    pub source: Source,
}
