//! Posting automaton: armed bets, loss streaks and suspension.
//!
//! Driven by exactly one event per resolved round. The automaton never
//! performs I/O; it returns the [`Effect`]s the caller should carry out.
//! Delivery failures on those effects do not feed back into its state.
//!
//! After `loss_limit` consecutive lost bets the automaton announces a
//! bad series and suspends itself. Only an operator [`resume`] lifts
//! the suspension.
//!
//! [`resume`]: PostingAutomaton::resume

use serde::{Deserialize, Serialize};

use super::draw::{DrawRecord, Period, SizeClass};
use super::prediction::{Source, Verdict};

/// A bet that has been announced and waits for its target period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    /// The upcoming period this bet targets.
    pub period: Period,
    pub pick: SizeClass,
    pub confidence: f64,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostingState {
    Idle,
    Armed(BetRecord),
    Suspended,
}

/// Side effects requested by one step.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// The armed bet hit. `announce` is false while posting is disabled.
    Win {
        bet: BetRecord,
        value: u8,
        announce: bool,
    },
    /// The armed bet missed. Bookkeeping only, nothing is announced.
    Loss {
        bet: BetRecord,
        value: u8,
        consecutive_losses: u32,
    },
    /// The armed bet targeted a different period than the one that
    /// resolved (a round was skipped) and was dropped unscored.
    Expired { bet: BetRecord },
    /// The loss limit was reached; posting is suspended.
    BadSeries { consecutive_losses: u32 },
    /// Announce the next bet.
    NewBet { bet: BetRecord },
}

#[derive(Debug, Clone)]
pub struct PostingAutomaton {
    state: PostingState,
    consecutive_losses: u32,
    loss_limit: u32,
}

impl PostingAutomaton {
    pub fn new(loss_limit: u32) -> Self {
        Self {
            state: PostingState::Idle,
            consecutive_losses: 0,
            loss_limit: loss_limit.max(1),
        }
    }

    pub fn state(&self) -> &PostingState {
        &self.state
    }

    pub fn armed_bet(&self) -> Option<&BetRecord> {
        match &self.state {
            PostingState::Armed(bet) => Some(bet),
            _ => None,
        }
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.state, PostingState::Suspended)
    }

    /// Process one resolved round.
    pub fn on_round_resolved(
        &mut self,
        draw: &DrawRecord,
        verdict: &Verdict,
        should_post: bool,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();

        // 1. settle the armed bet
        let armed = match std::mem::replace(&mut self.state, PostingState::Idle) {
            PostingState::Armed(bet) => Some(bet),
            other => {
                self.state = other;
                None
            }
        };

        match armed {
            Some(bet) if bet.period == draw.period => {
                if bet.pick == draw.size {
                    self.consecutive_losses = 0;
                    effects.push(Effect::Win {
                        bet,
                        value: draw.value,
                        announce: should_post,
                    });
                } else {
                    self.consecutive_losses += 1;
                    effects.push(Effect::Loss {
                        bet,
                        value: draw.value,
                        consecutive_losses: self.consecutive_losses,
                    });
                }
            }
            Some(bet) => effects.push(Effect::Expired { bet }),
            None => {}
        }

        // 2. bad series
        if !self.is_suspended() && self.consecutive_losses >= self.loss_limit {
            self.state = PostingState::Suspended;
            effects.push(Effect::BadSeries {
                consecutive_losses: self.consecutive_losses,
            });
        }

        // 3./4. arm the next bet or stay quiet
        if self.is_suspended() {
            return effects;
        }
        if should_post {
            let bet = BetRecord {
                period: draw.period.next(),
                pick: verdict.pick,
                confidence: verdict.confidence,
                source: verdict.source,
            };
            self.state = PostingState::Armed(bet.clone());
            effects.push(Effect::NewBet { bet });
        } else {
            self.state = PostingState::Idle;
        }

        effects
    }

    /// Lift a suspension. Returns false when there was nothing to lift.
    pub fn resume(&mut self) -> bool {
        if !self.is_suspended() {
            return false;
        }
        self.state = PostingState::Idle;
        self.consecutive_losses = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn draw(period: &str, value: i64) -> DrawRecord {
        DrawRecord::new(Period::parse(period).unwrap(), value, Utc::now()).unwrap()
    }

    fn verdict(pick: SizeClass) -> Verdict {
        Verdict {
            pick,
            confidence: 70.0,
            source: Source::StreakRule,
        }
    }

    #[test]
    fn test_posting_arms_next_period() {
        let mut auto = PostingAutomaton::new(4);
        let effects = auto.on_round_resolved(&draw("100", 7), &verdict(SizeClass::Big), true);

        let bet = auto.armed_bet().unwrap();
        assert_eq!(bet.period.as_str(), "101");
        assert_eq!(bet.pick, SizeClass::Big);
        assert!(matches!(&effects[..], [Effect::NewBet { .. }]));
    }

    #[test]
    fn test_win_resets_losses() {
        let mut auto = PostingAutomaton::new(4);
        auto.on_round_resolved(&draw("100", 7), &verdict(SizeClass::Small), true);
        auto.on_round_resolved(&draw("101", 8), &verdict(SizeClass::Big), true);
        assert_eq!(auto.consecutive_losses(), 1);

        let effects = auto.on_round_resolved(&draw("102", 9), &verdict(SizeClass::Big), true);
        assert_eq!(auto.consecutive_losses(), 0);
        assert!(matches!(effects[0], Effect::Win { announce: true, value: 9, .. }));
    }

    #[test]
    fn test_loss_emits_no_win() {
        let mut auto = PostingAutomaton::new(4);
        auto.on_round_resolved(&draw("100", 7), &verdict(SizeClass::Big), true);
        let effects = auto.on_round_resolved(&draw("101", 2), &verdict(SizeClass::Big), true);

        assert_eq!(auto.consecutive_losses(), 1);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Win { .. })));
        assert!(matches!(effects[0], Effect::Loss { consecutive_losses: 1, .. }));
    }

    #[test]
    fn test_four_losses_suspend_once() {
        let mut auto = PostingAutomaton::new(4);
        auto.on_round_resolved(&draw("100", 7), &verdict(SizeClass::Big), true);

        let mut bad_series = 0;
        for (i, period) in ["101", "102", "103", "104", "105", "106"].iter().enumerate() {
            let effects = auto.on_round_resolved(&draw(period, 1), &verdict(SizeClass::Big), true);
            bad_series += effects
                .iter()
                .filter(|e| matches!(e, Effect::BadSeries { .. }))
                .count();
            if i == 3 {
                assert!(auto.is_suspended());
                assert!(auto.armed_bet().is_none());
                assert!(!effects.iter().any(|e| matches!(e, Effect::NewBet { .. })));
            }
        }

        assert_eq!(bad_series, 1);
        assert_eq!(auto.consecutive_losses(), 4);
        assert!(auto.is_suspended());
    }

    #[test]
    fn test_resume_lifts_suspension() {
        let mut auto = PostingAutomaton::new(1);
        auto.on_round_resolved(&draw("100", 7), &verdict(SizeClass::Big), true);
        auto.on_round_resolved(&draw("101", 1), &verdict(SizeClass::Big), true);
        assert!(auto.is_suspended());

        assert!(auto.resume());
        assert!(!auto.resume());
        assert_eq!(auto.consecutive_losses(), 0);

        let effects = auto.on_round_resolved(&draw("102", 1), &verdict(SizeClass::Small), true);
        assert!(matches!(&effects[..], [Effect::NewBet { .. }]));
    }

    #[test]
    fn test_posting_disabled_clears_bet() {
        let mut auto = PostingAutomaton::new(4);
        auto.on_round_resolved(&draw("100", 7), &verdict(SizeClass::Big), true);
        let effects = auto.on_round_resolved(&draw("101", 9), &verdict(SizeClass::Big), false);

        assert_eq!(*auto.state(), PostingState::Idle);
        assert!(matches!(effects[0], Effect::Win { announce: false, .. }));
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn test_skipped_round_expires_bet() {
        let mut auto = PostingAutomaton::new(4);
        auto.on_round_resolved(&draw("100", 7), &verdict(SizeClass::Big), true);
        let effects = auto.on_round_resolved(&draw("103", 1), &verdict(SizeClass::Big), true);

        assert!(matches!(effects[0], Effect::Expired { .. }));
        assert_eq!(auto.consecutive_losses(), 0);
        assert_eq!(auto.armed_bet().unwrap().period.as_str(), "104");
    }
}
