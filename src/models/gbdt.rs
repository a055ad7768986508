//! Gradient-boosted regression trees for daily demand.
//!
//! Least-squares boosting over depth-limited trees with exact greedy
//! splits, shrinkage, and seeded row subsampling.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::models::traits::{Forecaster, ModelParams};

/// z-score for a symmetric 90% interval.
const Z_90: f64 = 1.645;

/// Hyperparameters for [`GradientBoostedTrees`].
///
/// Defaults are tuned for daily demand series with weekly seasonality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GbdtParams {
    /// Number of boosting rounds.
    pub n_estimators: usize,
    /// Shrinkage applied to each tree's contribution.
    pub learning_rate: f64,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum rows on each side of a split.
    pub min_samples_leaf: usize,
    /// Fraction of rows sampled (without replacement) per boosting round.
    pub subsample: f64,
    /// RNG seed for row subsampling.
    pub seed: u64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.05,
            max_depth: 4,
            min_samples_leaf: 5,
            subsample: 0.8,
            seed: 42,
        }
    }
}

impl GbdtParams {
    /// Parse hyperparameter overrides from a `model_params` mapping.
    /// Unknown keys are rejected.
    pub fn from_map(params: &ModelParams) -> Result<Self> {
        let object: serde_json::Map<String, serde_json::Value> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let parsed: GbdtParams = serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| ForecastError::InvalidParameter(format!("model_params: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "learning_rate must be in (0, 1]".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_depth must be positive".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_leaf must be positive".to_string(),
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "subsample must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single depth-limited regression tree fit to residuals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    targets: &'a [f64],
    max_depth: usize,
    min_samples_leaf: usize,
    nodes: Vec<Node>,
    gains: &'a mut [f64],
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, indices: Vec<usize>) -> RegressionTree {
        self.grow(indices, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let mean =
            indices.iter().map(|&i| self.targets[i]).sum::<f64>() / indices.len() as f64;

        if depth >= self.max_depth || indices.len() < 2 * self.min_samples_leaf {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        }

        let Some(split) = self.best_split(&indices) else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        self.gains[split.feature] += split.gain;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        // Placeholder so children get stable indices, patched below.
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });
        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    /// Exact greedy split search: for each feature, sort the node's rows
    /// and scan candidate thresholds with prefix sums. The gain is the
    /// reduction in sum of squared errors.
    fn best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len() as f64;
        let total: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let parent_score = total * total / n;
        let n_features = self.x[indices[0]].len();

        let mut best: Option<SplitCandidate> = None;

        for feature in 0..n_features {
            let mut order = indices.to_vec();
            order.sort_by(|&a, &b| {
                self.x[a][feature]
                    .partial_cmp(&self.x[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_sum = 0.0;
            for (k, &row) in order[..order.len() - 1].iter().enumerate() {
                left_sum += self.targets[row];
                let left_n = k + 1;
                let right_n = order.len() - left_n;

                let here = self.x[row][feature];
                let next = self.x[order[k + 1]][feature];
                if here == next {
                    continue;
                }
                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / left_n as f64
                    + right_sum * right_sum / right_n as f64
                    - parent_score;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Gradient-boosted decision tree regressor.
///
/// `predict_intervals` deliberately deviates from the base contract: it
/// returns `point +/- 1.645 * sigma` where sigma is the standard deviation
/// of in-sample residuals after fitting, an approximate 90% band, and
/// **ignores the `alpha` argument**. The base interface's alpha-width band
/// does not apply to this model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: GbdtParams,
    base_score: f64,
    trees: Vec<RegressionTree>,
    residual_std: f64,
    gains: Vec<f64>,
    fitted: bool,
}

impl GradientBoostedTrees {
    pub fn new(params: GbdtParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            base_score: 0.0,
            trees: Vec::new(),
            residual_std: 0.0,
            gains: Vec::new(),
            fitted: false,
        })
    }

    /// Build from a `model_params` override mapping.
    pub fn from_params_map(params: &ModelParams) -> Result<Self> {
        Self::new(GbdtParams::from_map(params)?)
    }

    /// Standard deviation of in-sample residuals after the last fit.
    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }

    fn predict_raw(&self, row: &[f64]) -> f64 {
        let mut value = self.base_score;
        for tree in &self.trees {
            value += self.params.learning_rate * tree.predict_row(row);
        }
        value
    }

    fn sample_rows(&self, rng: &mut StdRng, n: usize) -> Vec<usize> {
        if self.params.subsample >= 1.0 {
            return (0..n).collect();
        }
        let k = ((n as f64 * self.params.subsample).round() as usize).clamp(1, n);
        rand::seq::index::sample(rng, n, k).into_vec()
    }
}

impl Forecaster for GradientBoostedTrees {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.is_empty() || y.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if x.len() != y.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: x.len(),
                got: y.len(),
            });
        }

        let n = y.len();
        let width = x[0].len();

        // Reset so a reused instance behaves like a clean one.
        self.trees.clear();
        self.gains = vec![0.0; width];

        self.base_score = y.iter().sum::<f64>() / n as f64;
        let mut preds = vec![self.base_score; n];
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        for _ in 0..self.params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(preds.iter()).map(|(a, p)| a - p).collect();
            let indices = self.sample_rows(&mut rng, n);

            let builder = TreeBuilder {
                x,
                targets: &residuals,
                max_depth: self.params.max_depth,
                min_samples_leaf: self.params.min_samples_leaf,
                nodes: Vec::new(),
                gains: &mut self.gains,
            };
            let tree = builder.build(indices);

            for (pred, row) in preds.iter_mut().zip(x.iter()) {
                *pred += self.params.learning_rate * tree.predict_row(row);
            }
            self.trees.push(tree);
        }

        let variance = y
            .iter()
            .zip(preds.iter())
            .map(|(a, p)| (a - p).powi(2))
            .sum::<f64>()
            / n as f64;
        self.residual_std = variance.sqrt();
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::FitRequired);
        }
        Ok(x.iter().map(|row| self.predict_raw(row).max(0.0)).collect())
    }

    /// Residual-sigma interval; `alpha` is ignored (see the type docs).
    fn predict_intervals(&self, x: &[Vec<f64>], _alpha: f64) -> Result<(Vec<f64>, Vec<f64>)> {
        let p50 = self.predict(x)?;
        let band = Z_90 * self.residual_std;
        let p10 = p50.iter().map(|v| (v - band).max(0.0)).collect();
        let p90 = p50.iter().map(|v| v + band).collect();
        Ok((p10, p90))
    }

    fn params(&self) -> ModelParams {
        match serde_json::to_value(&self.params) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => ModelParams::new(),
        }
    }

    fn name(&self) -> &str {
        "gbdt"
    }

    fn feature_importances(&self, feature_names: &[String]) -> BTreeMap<String, f64> {
        feature_names
            .iter()
            .zip(self.gains.iter())
            .filter(|(_, gain)| **gain > 0.0)
            .map(|(name, gain)| (name.clone(), *gain))
            .collect()
    }

    fn model_artifact(&self) -> Option<Vec<u8>> {
        serde_json::to_vec(self).ok()
    }
}
