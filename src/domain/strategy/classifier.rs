//! Lagged-classifier strategy.
//!
//! Encodes the history as bits (Big = 1), builds `lags` shifted copies
//! as features, and retrains a boosted classifier from scratch on every
//! call. The model then scores the feature row built from the most
//! recent rounds.

use super::{require_history, Strategy};
use crate::domain::draw::SizeClass;
use crate::domain::gbm::{BoostingParams, GradientBoostedClassifier};
use crate::domain::prediction::{Abstain, Prediction, Source};

#[derive(Debug, Clone)]
pub struct LaggedClassifier {
    min_history: usize,
    lags: usize,
    params: BoostingParams,
}

impl LaggedClassifier {
    pub fn new(min_history: usize, lags: usize, params: BoostingParams) -> Self {
        let lags = lags.max(1);
        Self {
            min_history: min_history.max(lags + 1),
            lags,
            params,
        }
    }

    /// Rows `[y(t-1), .., y(t-lags)]` with target `y(t)` for every `t`
    /// that has a complete lag context.
    fn training_set(&self, bits: &[f64]) -> (Vec<Vec<f64>>, Vec<u8>) {
        (self.lags..bits.len())
            .map(|t| {
                let row: Vec<f64> = (1..=self.lags).map(|k| bits[t - k]).collect();
                (row, bits[t] as u8)
            })
            .unzip()
    }
}

impl Default for LaggedClassifier {
    /// 20 rounds minimum, three lags, default boosting parameters.
    fn default() -> Self {
        Self::new(20, 3, BoostingParams::default())
    }
}

impl Strategy for LaggedClassifier {
    fn source(&self) -> Source {
        Source::LaggedClassifier
    }

    fn evaluate(&self, history: &[SizeClass]) -> Prediction {
        if let Err(abstain) = require_history(self.source(), history, self.min_history) {
            return abstain;
        }

        let bits: Vec<f64> = history.iter().map(|s| f64::from(s.as_bit())).collect();
        let (x, y) = self.training_set(&bits);

        let model = match GradientBoostedClassifier::fit(&self.params, &x, &y) {
            Ok(model) => model,
            Err(e) => {
                return Prediction::abstain(self.source(), Abstain::TrainingFailure(e.to_string()));
            }
        };

        // lag 1 is the round that just resolved
        let n = bits.len();
        let current: Vec<f64> = (0..self.lags).map(|k| bits[n - 1 - k]).collect();
        let p_big = model.predict_proba(&current);
        if !p_big.is_finite() {
            return Prediction::abstain(
                self.source(),
                Abstain::TrainingFailure("non-finite probability".to_string()),
            );
        }

        let pick = if p_big > 0.5 { SizeClass::Big } else { SizeClass::Small };
        let confidence = (p_big.max(1.0 - p_big) * 100.0 * 100.0).round() / 100.0;
        Prediction::pick(self.source(), pick, confidence)
    }
}
