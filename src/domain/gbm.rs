//! Gradient-boosted binary classifier over small dense feature rows.
//!
//! Binomial deviance loss with a log-odds prior, shallow regression
//! trees fitted to the residuals, and one Newton step per leaf. Split
//! search is exhaustive and ties keep the first candidate found
//! (feature order, then ascending threshold), so fitting is fully
//! deterministic without a random seed.

use thiserror::Error;

/// Why a model could not be fitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("no training rows")]
    NoRows,

    #[error("{rows} feature rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("feature rows must share one non-zero width")]
    RaggedFeatures,

    #[error("target contains a single class")]
    SingleClass,
}

/// Boosting hyper-parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostingParams {
    /// Number of boosting stages (trees).
    pub n_estimators: usize,
    /// Shrinkage applied to every tree's contribution.
    pub learning_rate: f64,
    /// Maximum depth of each regression tree.
    pub max_depth: usize,
    /// A node with fewer samples becomes a leaf.
    pub min_samples_split: usize,
}

impl Default for BoostingParams {
    /// Fast and shallow: 50 depth-2 trees at learning rate 0.2.
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 0.2,
            max_depth: 2,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn value(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf(v) => *v,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.value(row)
                } else {
                    right.value(row)
                }
            }
        }
    }
}

/// A fitted ensemble.
#[derive(Debug, Clone)]
pub struct GradientBoostedClassifier {
    init_log_odds: f64,
    learning_rate: f64,
    n_features: usize,
    trees: Vec<Node>,
}

impl GradientBoostedClassifier {
    /// Fit on rows `x` with binary targets `y` (0 or 1; anything else is 1).
    pub fn fit(params: &BoostingParams, x: &[Vec<f64>], y: &[u8]) -> Result<Self, FitError> {
        if x.is_empty() {
            return Err(FitError::NoRows);
        }
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch {
                rows: x.len(),
                targets: y.len(),
            });
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(FitError::RaggedFeatures);
        }

        let target: Vec<f64> = y.iter().map(|&v| if v == 0 { 0.0 } else { 1.0 }).collect();
        let positives = target.iter().sum::<f64>();
        let n = target.len() as f64;
        if positives == 0.0 || positives == n {
            return Err(FitError::SingleClass);
        }

        let prior = positives / n;
        let init_log_odds = (prior / (1.0 - prior)).ln();
        let mut raw = vec![init_log_odds; x.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);

        let builder = TreeBuilder {
            x,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
        };

        for _ in 0..params.n_estimators {
            let prob: Vec<f64> = raw.iter().map(|&r| sigmoid(r)).collect();
            let residual: Vec<f64> = target.iter().zip(&prob).map(|(t, p)| t - p).collect();

            let indices: Vec<usize> = (0..x.len()).collect();
            let tree = builder.grow(&residual, &prob, indices, 0);

            for (i, row) in x.iter().enumerate() {
                raw[i] += params.learning_rate * tree.value(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            init_log_odds,
            learning_rate: params.learning_rate,
            n_features,
            trees,
        })
    }

    /// Probability of class 1 for one row.
    ///
    /// Rows narrower than the training width read missing features as 0.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut padded;
        let row = if row.len() < self.n_features {
            padded = row.to_vec();
            padded.resize(self.n_features, 0.0);
            padded.as_slice()
        } else {
            row
        };

        let raw = self.init_log_odds
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.value(row))
                .sum::<f64>();
        sigmoid(raw)
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    max_depth: usize,
    min_samples_split: usize,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl TreeBuilder<'_> {
    fn grow(&self, residual: &[f64], prob: &[f64], indices: Vec<usize>, depth: usize) -> Node {
        if depth >= self.max_depth || indices.len() < self.min_samples_split {
            return Node::Leaf(newton_step(residual, prob, &indices));
        }

        let Some(split) = self.best_split(residual, &indices) else {
            return Node::Leaf(newton_step(residual, prob, &indices));
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(residual, prob, left, depth + 1)),
            right: Box::new(self.grow(residual, prob, right, depth + 1)),
        }
    }

    /// Exhaustive search for the split with the largest squared-error reduction.
    fn best_split(&self, residual: &[f64], indices: &[usize]) -> Option<SplitCandidate> {
        let n_features = self.x[indices[0]].len();
        let parent = sse(indices.iter().map(|&i| residual[i]));
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..n_features {
            let mut values: Vec<f64> = indices.iter().map(|&i| self.x[i][feature]).collect();
            values.sort_by(|a, b| a.total_cmp(b));
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let left = sse(
                    indices
                        .iter()
                        .filter(|&&i| self.x[i][feature] <= threshold)
                        .map(|&i| residual[i]),
                );
                let right = sse(
                    indices
                        .iter()
                        .filter(|&&i| self.x[i][feature] > threshold)
                        .map(|&i| residual[i]),
                );
                let gain = parent - left - right;

                if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Sum of squared deviations from the mean.
fn sse(values: impl Iterator<Item = f64>) -> f64 {
    let (mut count, mut sum, mut sum_sq) = (0.0, 0.0, 0.0);
    for v in values {
        count += 1.0;
        sum += v;
        sum_sq += v * v;
    }
    if count == 0.0 { 0.0 } else { sum_sq - sum * sum / count }
}

/// Leaf value for binomial deviance: sum(residual) / sum(p * (1 - p)).
fn newton_step(residual: &[f64], prob: &[f64], indices: &[usize]) -> f64 {
    let numerator: f64 = indices.iter().map(|&i| residual[i]).sum();
    let denominator: f64 = indices.iter().map(|&i| prob[i] * (1.0 - prob[i])).sum();
    if denominator.abs() < 1e-150 {
        0.0
    } else {
        numerator / denominator
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
