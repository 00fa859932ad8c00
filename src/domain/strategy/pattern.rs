//! Pattern-frequency strategy.
//!
//! Takes the last `pattern_len` outcomes as a context and looks up every
//! exact earlier occurrence of it in a bounded search window. The
//! outcomes that followed those occurrences vote on the next round; the
//! majority share becomes the confidence. A tie is not an opinion.

use super::{require_history, Strategy};
use crate::domain::draw::SizeClass;
use crate::domain::prediction::{Abstain, Prediction, Source};

#[derive(Debug, Clone)]
pub struct PatternFrequency {
    /// Minimum history before the strategy activates.
    min_history: usize,
    /// Context length.
    pattern_len: usize,
    /// How far back the search is allowed to start.
    search_window: usize,
}

impl PatternFrequency {
    pub fn new(min_history: usize, pattern_len: usize, search_window: usize) -> Self {
        Self {
            min_history: min_history.max(pattern_len + 1),
            pattern_len: pattern_len.max(1),
            search_window,
        }
    }

    /// Count (big, small) follow-ups of every match of the current context.
    fn tally(&self, history: &[SizeClass]) -> (usize, usize) {
        let n = history.len();
        let pattern = &history[n - self.pattern_len..];
        let start = n.saturating_sub(self.search_window);

        let mut big = 0;
        let mut small = 0;
        // The follow-up at i + pattern_len must exist, which also excludes
        // the current context matching itself.
        for i in start..n.saturating_sub(self.pattern_len) {
            if &history[i..i + self.pattern_len] == pattern {
                match history[i + self.pattern_len] {
                    SizeClass::Big => big += 1,
                    SizeClass::Small => small += 1,
                }
            }
        }
        (big, small)
    }
}

impl Default for PatternFrequency {
    /// 10 rounds minimum, length-3 context, last 500 rounds searched.
    fn default() -> Self {
        Self::new(10, 3, 500)
    }
}

impl Strategy for PatternFrequency {
    fn source(&self) -> Source {
        Source::PatternFrequency
    }

    fn evaluate(&self, history: &[SizeClass]) -> Prediction {
        if let Err(abstain) = require_history(self.source(), history, self.min_history) {
            return abstain;
        }

        let (big, small) = self.tally(history);
        let total = big + small;
        if total == 0 {
            return Prediction::abstain(self.source(), Abstain::NoMatch);
        }

        let big_pct = big as f64 / total as f64 * 100.0;
        let small_pct = small as f64 / total as f64 * 100.0;

        if big > small {
            Prediction::pick(self.source(), SizeClass::Big, big_pct)
        } else if small > big {
            Prediction::pick(self.source(), SizeClass::Small, small_pct)
        } else {
            Prediction::abstain(self.source(), Abstain::Tie)
        }
    }
}
