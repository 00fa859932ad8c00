//! Streak-rule strategy: a fixed lookup table over the tail of the history.

use super::{require_history, Strategy};
use crate::domain::draw::SizeClass::{self, Big, Small};
use crate::domain::prediction::{Abstain, Prediction, Source};

/// One row of the rule table: if the history ends with `tail`, predict `pick`.
#[derive(Debug, Clone, Copy)]
struct TailRule {
    tail: &'static [SizeClass],
    pick: SizeClass,
    confidence: f64,
}

/// Checked top to bottom, first match wins.
const RULES: &[TailRule] = &[
    // three in a row continues
    TailRule { tail: &[Big, Big, Big], pick: Big, confidence: 85.0 },
    TailRule { tail: &[Small, Small, Small], pick: Small, confidence: 85.0 },
    // 2-2 blocks
    TailRule { tail: &[Big, Big, Small, Small], pick: Big, confidence: 75.0 },
    TailRule { tail: &[Small, Small, Big, Big], pick: Small, confidence: 75.0 },
    // zig-zag
    TailRule { tail: &[Big, Small, Big], pick: Small, confidence: 70.0 },
    TailRule { tail: &[Small, Big, Small], pick: Big, confidence: 70.0 },
];

#[derive(Debug, Clone)]
pub struct StreakRule {
    min_history: usize,
}

impl StreakRule {
    pub fn new(min_history: usize) -> Self {
        // The longest rule needs four entries.
        Self { min_history: min_history.max(4) }
    }
}

impl Default for StreakRule {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Strategy for StreakRule {
    fn source(&self) -> Source {
        Source::StreakRule
    }

    fn evaluate(&self, history: &[SizeClass]) -> Prediction {
        if let Err(abstain) = require_history(self.source(), history, self.min_history) {
            return abstain;
        }

        RULES
            .iter()
            .find(|rule| history.ends_with(rule.tail))
            .map(|rule| Prediction::pick(self.source(), rule.pick, rule.confidence))
            .unwrap_or_else(|| Prediction::abstain(self.source(), Abstain::NoMatch))
    }
}
