//! Fixed-priority arbitration across the strategies.
//!
//! Stages are tried in order and the first one with an opinion (that
//! also clears the stage's confidence gate, if any) wins. When every
//! stage abstains, the arbiter repeats the size of the round that just
//! resolved. The result is therefore always a concrete [`Verdict`].

use super::draw::SizeClass;
use super::prediction::{Prediction, Source, Verdict};
use super::strategy::{LaggedClassifier, PatternFrequency, Strategy, StreakRule};

/// One entry in the priority chain.
pub struct Stage {
    strategy: Box<dyn Strategy>,
    /// Opinion only accepted when confidence is strictly above this.
    min_confidence: Option<f64>,
}

impl Stage {
    pub fn new(strategy: impl Strategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
            min_confidence: None,
        }
    }

    pub fn gated(strategy: impl Strategy + 'static, min_confidence: f64) -> Self {
        Self {
            strategy: Box::new(strategy),
            min_confidence: Some(min_confidence),
        }
    }

    fn accepts(&self, prediction: &Prediction) -> bool {
        prediction.is_opinion()
            && self
                .min_confidence
                .is_none_or(|gate| prediction.confidence() > gate)
    }
}

/// Result of one arbitration: the verdict plus every stage's raw output.
#[derive(Debug, Clone)]
pub struct Arbitration {
    pub verdict: Verdict,
    pub candidates: Vec<Prediction>,
}

impl Arbitration {
    /// Raw output of the stage backed by `source`, if that stage exists.
    pub fn candidate(&self, source: Source) -> Option<&Prediction> {
        self.candidates.iter().find(|p| p.source == source)
    }
}

pub struct Arbiter {
    stages: Vec<Stage>,
    fallback_confidence: f64,
    max_confidence: f64,
}

impl Arbiter {
    /// An empty chain: everything falls through to the trend fallback.
    pub fn new(fallback_confidence: f64, max_confidence: f64) -> Self {
        Self {
            stages: Vec::new(),
            fallback_confidence,
            max_confidence,
        }
    }

    /// Append a stage at the lowest priority so far.
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Streak rules, then gated pattern frequency, then the classifier.
    pub fn standard(
        streak: StreakRule,
        pattern: PatternFrequency,
        pattern_gate: f64,
        classifier: LaggedClassifier,
        fallback_confidence: f64,
        max_confidence: f64,
    ) -> Self {
        Self::new(fallback_confidence, max_confidence)
            .with_stage(Stage::new(streak))
            .with_stage(Stage::gated(pattern, pattern_gate))
            .with_stage(Stage::new(classifier))
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Pick the next round's size. `just_resolved` feeds the fallback.
    pub fn select(&self, history: &[SizeClass], just_resolved: SizeClass) -> Arbitration {
        let candidates: Vec<Prediction> = self
            .stages
            .iter()
            .map(|stage| stage.strategy.evaluate(history))
            .collect();

        let chosen = self
            .stages
            .iter()
            .zip(&candidates)
            .find(|(stage, prediction)| stage.accepts(prediction))
            .and_then(|(_, prediction)| {
                prediction.size_class().map(|pick| Verdict {
                    pick,
                    confidence: prediction.confidence(),
                    source: prediction.source,
                })
            });

        let mut verdict = chosen.unwrap_or(Verdict {
            pick: just_resolved,
            confidence: self.fallback_confidence,
            source: Source::BlindTrend,
        });
        verdict.confidence = verdict.confidence.clamp(0.0, self.max_confidence);

        Arbitration {
            verdict,
            candidates,
        }
    }
}

impl Default for Arbiter {
    /// Gate 55, fallback 51, cap 99.
    fn default() -> Self {
        Self::standard(
            StreakRule::default(),
            PatternFrequency::default(),
            55.0,
            LaggedClassifier::default(),
            51.0,
            99.0,
        )
    }
}
