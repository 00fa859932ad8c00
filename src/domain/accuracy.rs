//! Running win/loss bookkeeping for predictions.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::draw::SizeClass;

/// Size of the recent-results window.
pub const RECENT_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetResult {
    Win,
    Loss,
}


/// Persisted accuracy counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyState {
    pub total_bets: u64,
    pub wins: u64,
    #[serde(rename = "last_10_results")]
    recent: VecDeque<BetResult>,
}

impl AccuracyState {
    pub fn new() -> Self {
        Self {
            total_bets: 0,
            wins: 0,
            recent: VecDeque::with_capacity(RECENT_WINDOW),
        }
    }

    /// Score one prediction against the real outcome.
    ///
    /// `None` means there was no prediction for this round and leaves
    /// the state untouched. Returns the recorded result otherwise.
    pub fn record(&mut self, real: SizeClass, predicted: Option<SizeClass>) -> Option<BetResult> {
        let predicted = predicted?;
        let result = if predicted == real {
            BetResult::Win
        } else {
            BetResult::Loss
        };

        self.total_bets += 1;
        if result == BetResult::Win {
            self.wins += 1;
        }
        self.recent.push_back(result);
        while self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
        Some(result)
    }

    pub fn losses(&self) -> u64 {
        self.total_bets - self.wins
    }

    /// Oldest first.
    pub fn recent(&self) -> impl Iterator<Item = BetResult> + '_ {
        self.recent.iter().copied()
    }

    /// Win rate in percent, one decimal; 0 before the first bet.
    pub fn win_rate(&self) -> f64 {
        if self.total_bets == 0 {
            return 0.0;
        }
        (self.wins as f64 / self.total_bets as f64 * 1000.0).round() / 10.0
    }

    /// Repair counters from an older or hand-edited file.
    pub fn normalized(mut self) -> Self {
        self.wins = self.wins.min(self.total_bets);
        while self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
        self
    }
}

impl Default for AccuracyState {
    fn default() -> Self {
        Self::new()
    }
}
