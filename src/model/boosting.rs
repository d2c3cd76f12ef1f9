//! Gradient-boosted regression trees.
//!
//! Starts from the label mean and adds one shrunken [`RegressionTree`] per
//! round, each fit to the current residuals on a seeded row subsample.

use crate::error::{PipelineError, Result};
use crate::model::tree::{RegressionTree, RegressionTreeTrainer};
use crate::model::{check_training_data, check_width, FeatureVector, Model, Trainer};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Boosted-tree trainer configuration.
///
/// # Example
/// ```
/// use taxi_fares::model::{FastTreeRegressor, Model, Trainer};
///
/// let x: Vec<Vec<f32>> = (0..40).map(|i| vec![i as f32]).collect();
/// let y: Vec<f32> = (0..40).map(|i| 2.0 * i as f32).collect();
///
/// let model = FastTreeRegressor::default()
///     .with_n_trees(50)
///     .with_min_samples_leaf(2)
///     .fit(&x, &y)
///     .unwrap();
/// let p = model.predict(&[20.0]).unwrap();
/// assert!((p - 40.0).abs() < 4.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastTreeRegressor {
    pub n_trees: usize,
    /// Shrinkage applied to each tree's output.
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each tree.
    pub subsample: f64,
    pub seed: u64,
}

impl Default for FastTreeRegressor {
    fn default() -> Self {
        Self {
            n_trees: 100,
            learning_rate: 0.2,
            max_depth: 6,
            min_samples_leaf: 10,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl FastTreeRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_trees(mut self, n: usize) -> Self {
        self.n_trees = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn with_subsample(mut self, fraction: f64) -> Self {
        self.subsample = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn tree_trainer(&self) -> RegressionTreeTrainer {
        RegressionTreeTrainer::new()
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
    }

    fn check_params(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(PipelineError::InvalidParameter(
                "n_trees must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        self.tree_trainer().check_params()
    }

    fn sample_rows(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let amount = ((n as f64) * self.subsample).ceil() as usize;
        if amount >= n {
            return (0..n).collect();
        }
        let mut rows = rand::seq::index::sample(rng, n, amount.max(1)).into_vec();
        rows.sort_unstable();
        rows
    }
}

/// Fitted boosted-tree ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedTreesModel {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl BoostedTreesModel {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    fn predict_row(&self, row: &[f32]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| {
                acc + self.learning_rate * tree.predict_row(row)
            })
    }
}

impl Model for BoostedTreesModel {
    const KIND: &'static str = "fast_tree";

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f32]) -> Result<f32> {
        check_width(self.n_features, features)?;
        Ok(self.predict_row(features) as f32)
    }

    fn validate(&self) -> Result<()> {
        if !self.base_score.is_finite() || !self.learning_rate.is_finite() {
            return Err(PipelineError::CorruptArtifact(
                "boosted model has non-finite coefficients".to_string(),
            ));
        }
        for tree in &self.trees {
            if tree.n_features() != self.n_features {
                return Err(PipelineError::CorruptArtifact(format!(
                    "tree width {} differs from model width {}",
                    tree.n_features(),
                    self.n_features
                )));
            }
            tree.validate()?;
        }
        Ok(())
    }
}

impl Trainer for FastTreeRegressor {
    type Model = BoostedTreesModel;

    fn fit(&self, features: &[FeatureVector], labels: &[f32]) -> Result<Self::Model> {
        self.check_params()?;
        let n_features = check_training_data(features, labels)?;
        let n = features.len();

        let y: Vec<f64> = labels.iter().map(|&v| f64::from(v)).collect();
        let base_score = y.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut residuals = vec![0.0f64; n];

        let trainer = self.tree_trainer();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_trees);

        for round in 0..self.n_trees {
            for ((r, &target), &pred) in residuals.iter_mut().zip(&y).zip(&predictions) {
                *r = target - pred;
            }

            let rows = self.sample_rows(n, &mut rng);
            let tree = trainer.build(features, &residuals, &rows, n_features);

            for (pred, row) in predictions.iter_mut().zip(features) {
                *pred += self.learning_rate * tree.predict_row(row);
            }

            let mse = y
                .iter()
                .zip(&predictions)
                .map(|(t, p)| (t - p) * (t - p))
                .sum::<f64>()
                / n as f64;
            debug!(round, leaves = tree.n_leaves(), train_mse = mse, "boosting round");
            trees.push(tree);
        }

        Ok(BoostedTreesModel {
            base_score,
            learning_rate: self.learning_rate,
            trees,
            n_features,
        })
    }
}
