//! Prediction strategies over the size-class history.
//!
//! Every strategy is a pure function of the ordered history (oldest
//! first) to a [`Prediction`]. None of them hold mutable state, so the
//! same snapshot can be evaluated by all of them in any order.

pub mod classifier;
pub mod pattern;
pub mod streak;

pub use classifier::LaggedClassifier;
pub use pattern::PatternFrequency;
pub use streak::StreakRule;

use super::draw::SizeClass;
use super::prediction::{Abstain, Prediction, Source};

/// A single prediction heuristic.
pub trait Strategy: Send + Sync {
    /// Label attached to every prediction this strategy produces.
    fn source(&self) -> Source;

    /// Evaluate the history (oldest first) and predict the next round.
    fn evaluate(&self, history: &[SizeClass]) -> Prediction;
}

/// Shared guard: abstain when the history is shorter than `need`.
pub(crate) fn require_history(
    source: Source,
    history: &[SizeClass],
    need: usize,
) -> Result<(), Prediction> {
    if history.len() < need {
        return Err(Prediction::abstain(
            source,
            Abstain::InsufficientHistory {
                have: history.len(),
                need,
            },
        ));
    }
    Ok(())
}
