// Regression and classification models

use hoop_models::{HoopError, Result};
use linfa::prelude::*;
use linfa_elasticnet::MultiTaskElasticNet;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub trait PredictionModel {
    fn model_name(&self) -> &str;
}

/// L2-penalized linear regression fitted jointly on several targets.
///
/// `alpha` weights the penalty against the residual sum of squares.
#[derive(Serialize, Deserialize)]
pub struct RidgeRegressor {
    alpha: f64,
    targets: Vec<String>,
    model: MultiTaskElasticNet<f64>,
}

impl RidgeRegressor {
    pub fn fit(x: &Array2<f64>, y: &Array2<f64>, alpha: f64, targets: Vec<String>) -> Result<Self> {
        if x.nrows() == 0 || x.nrows() != y.nrows() {
            return Err(HoopError::Model(format!(
                "ridge needs matching non-empty inputs, got {} rows of features and {} of targets",
                x.nrows(),
                y.nrows()
            )));
        }
        // elastic net scales the data term by 1/(2n); rescale so alpha keeps
        // its sum-of-squares meaning
        let penalty = alpha / x.nrows() as f64;
        let dataset = Dataset::new(x.clone(), y.clone());
        let model = MultiTaskElasticNet::params()
            .penalty(penalty)
            .l1_ratio(0.0)
            .with_intercept(true)
            .max_iterations(10_000)
            .tolerance(1e-6)
            .fit(&dataset)
            .map_err(|e| HoopError::Model(format!("ridge fit failed: {e}")))?;
        debug!("Ridge fitted on {} rows x {} features", x.nrows(), x.ncols());

        Ok(Self { alpha, targets, model })
    }

    /// One output row per input row, columns in target order.
    pub fn predict(&self, x: &Array2<f64>) -> Array2<f64> {
        self.model.predict(x)
    }
}

impl PredictionModel for RidgeRegressor {
    fn model_name(&self) -> &str {
        "Ridge"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    /// Reweight classes inversely to their frequency.
    pub balanced: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(15),
            min_samples_leaf: 5,
            balanced: true,
            seed: 42,
        }
    }
}

/// Binary forest of bagged decision trees. Every tree is grown on its own
/// bootstrap sample and may split on any column.
#[derive(Serialize, Deserialize)]
pub struct RandomForestClassifier {
    config: ForestConfig,
    n_features: usize,
    members: Vec<DecisionTree<f64, usize>>,
}

impl RandomForestClassifier {
    pub fn fit(x: &Array2<f64>, y: &Array1<usize>, config: ForestConfig) -> Result<Self> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 || n_features == 0 || n_samples != y.len() {
            return Err(HoopError::Model(format!(
                "random forest needs matching non-empty inputs, got {n_samples}x{n_features} features and {} labels",
                y.len()
            )));
        }

        let class_weights = class_weights(y, config.balanced);
        let min_weight = class_weights.iter().copied().fold(f32::INFINITY, f32::min);
        let min_leaf_weight = config.min_samples_leaf as f32 * min_weight;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut members = Vec::with_capacity(config.n_trees);
        for _ in 0..config.n_trees {
            let rows: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

            let xs = x.select(Axis(0), &rows);
            let ys = y.select(Axis(0), &rows);
            let weights = ys.mapv(|label| class_weights[label.min(1)]);
            let dataset = Dataset::new(xs, ys).with_weights(weights);

            let tree = DecisionTree::<f64, usize>::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(config.max_depth)
                .min_weight_split(2.0 * min_leaf_weight)
                .min_weight_leaf(min_leaf_weight)
                .fit(&dataset)
                .map_err(|e| HoopError::Model(format!("decision tree fit failed: {e}")))?;
            members.push(tree);
        }
        debug!(
            "Random forest fitted: {} trees over {} features",
            members.len(),
            n_features
        );

        Ok(Self {
            config,
            n_features,
            members,
        })
    }

    /// Share of trees voting for the positive class, per row. Values are
    /// multiples of `1 / n_trees`.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut votes = Array1::<f64>::zeros(x.nrows());
        if self.members.is_empty() {
            return votes;
        }
        for tree in &self.members {
            let labels: Array1<usize> = tree.predict(x);
            votes.zip_mut_with(&labels, |v, &label| {
                if label == 1 {
                    *v += 1.0;
                }
            });
        }
        votes / self.members.len() as f64
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<usize> {
        self.predict_proba(x).mapv(|p| usize::from(p >= 0.5))
    }

    pub fn n_trees(&self) -> usize {
        self.members.len()
    }
}

impl PredictionModel for RandomForestClassifier {
    fn model_name(&self) -> &str {
        "RandomForestClassifier"
    }
}

/// `[negative, positive]` weights: `n / (2 * count)` when balanced.
fn class_weights(y: &Array1<usize>, balanced: bool) -> [f32; 2] {
    if !balanced {
        return [1.0, 1.0];
    }
    let positives = y.iter().filter(|&&l| l == 1).count();
    let negatives = y.len() - positives;
    let weight = |count: usize| {
        if count == 0 {
            1.0
        } else {
            y.len() as f32 / (2.0 * count as f32)
        }
    };
    [weight(negatives), weight(positives)]
}
