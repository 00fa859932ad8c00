//! Bet journal entries.
//!
//! Every posting decision is appended to a JSONL audit log so the
//! channel history can be reconstructed and win rates checked offline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::draw::{Period, SizeClass};
use super::posting::{BetRecord, Effect};
use super::prediction::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetEventKind {
    Posted,
    Won,
    Lost,
    Expired,
    BadSeries,
}

/// One line of the bet journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetEvent {
    /// Journal entry ID
    pub id: Uuid,
    pub kind: BetEventKind,
    /// Target period of the bet (resolved period for `BadSeries`)
    pub period: Period,
    /// Picked size; absent for `BadSeries`
    pub pick: Option<SizeClass>,
    /// Resolved outcome value, once known
    pub outcome: Option<u8>,
    pub confidence: Option<f64>,
    pub source: Option<Source>,
    /// Consecutive losses after this event
    pub consecutive_losses: u32,
    /// Whether the event was announced on the channel
    pub announced: bool,
    pub recorded_at: DateTime<Utc>,
}

impl BetEvent {
    fn for_bet(
        kind: BetEventKind,
        bet: &BetRecord,
        outcome: Option<u8>,
        consecutive_losses: u32,
        announced: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            period: bet.period.clone(),
            pick: Some(bet.pick),
            outcome,
            confidence: Some(bet.confidence),
            source: Some(bet.source),
            consecutive_losses,
            announced,
            recorded_at: now,
        }
    }

    /// Journal entry for one automaton effect.
    ///
    /// `resolved` is the period that triggered the step and
    /// `consecutive_losses` the automaton counter after it. `announced`
    /// is true only if the channel post actually went out.
    pub fn from_effect(
        effect: &Effect,
        resolved: &Period,
        consecutive_losses: u32,
        announced: bool,
        now: DateTime<Utc>,
    ) -> Self {
        match effect {
            Effect::Win { bet, value, .. } => Self::for_bet(
                BetEventKind::Won,
                bet,
                Some(*value),
                consecutive_losses,
                announced,
                now,
            ),
            Effect::Loss {
                bet,
                value,
                consecutive_losses,
            } => Self::for_bet(
                BetEventKind::Lost,
                bet,
                Some(*value),
                *consecutive_losses,
                announced,
                now,
            ),
            Effect::Expired { bet } => Self::for_bet(
                BetEventKind::Expired,
                bet,
                None,
                consecutive_losses,
                announced,
                now,
            ),
            Effect::NewBet { bet } => Self::for_bet(
                BetEventKind::Posted,
                bet,
                None,
                consecutive_losses,
                announced,
                now,
            ),
            Effect::BadSeries { consecutive_losses } => Self {
                id: Uuid::new_v4(),
                kind: BetEventKind::BadSeries,
                period: resolved.clone(),
                pick: None,
                outcome: None,
                confidence: None,
                source: None,
                consecutive_losses: *consecutive_losses,
                announced,
                recorded_at: now,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bet() -> BetRecord {
        BetRecord {
            period: Period::parse("20240101100010124").unwrap(),
            pick: SizeClass::Small,
            confidence: 75.0,
            source: Source::PatternFrequency,
        }
    }

    #[test]
    fn test_loss_event_keeps_counter() {
        let resolved = Period::parse("20240101100010124").unwrap();
        let effect = Effect::Loss {
            bet: bet(),
            value: 8,
            consecutive_losses: 3,
        };
        let ev = BetEvent::from_effect(&effect, &resolved, 3, false, Utc::now());
        assert_eq!(ev.kind, BetEventKind::Lost);
        assert_eq!(ev.outcome, Some(8));
        assert_eq!(ev.consecutive_losses, 3);
        assert!(!ev.announced);
    }

    #[test]
    fn test_bad_series_uses_resolved_period() {
        let resolved = Period::parse("777").unwrap();
        let effect = Effect::BadSeries {
            consecutive_losses: 4,
        };
        let ev = BetEvent::from_effect(&effect, &resolved, 4, true, Utc::now());
        assert_eq!(ev.period.as_str(), "777");
        assert_eq!(ev.pick, None);
        assert!(ev.announced);

        let line = serde_json::to_string(&ev).unwrap();
        assert!(line.contains("\"kind\":\"bad_series\""));
    }

    #[test]
    fn test_undelivered_bet_not_marked_announced() {
        let resolved = Period::parse("20240101100010123").unwrap();
        let effect = Effect::NewBet { bet: bet() };
        let ev = BetEvent::from_effect(&effect, &resolved, 0, false, Utc::now());
        assert_eq!(ev.kind, BetEventKind::Posted);
        assert!(!ev.announced);
    }
}
