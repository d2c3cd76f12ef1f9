//! CART regression tree.
//!
//! Splits minimise the summed squared error of the children. For each feature
//! the rows are sorted once and every boundary between distinct values is
//! scored with running sums, so one feature costs `O(n log n)` per node.

use crate::error::{PipelineError, Result};
use crate::model::{check_training_data, check_width, FeatureVector, Model, Trainer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Gains at or below this are treated as no improvement.
const MIN_GAIN: f64 = 1e-12;

/// Tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Rows with `features[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict(&self, row: &[f32]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if f64::from(row[*feature]) <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    fn check(&self, n_features: usize) -> Result<()> {
        match self {
            TreeNode::Leaf { value, .. } if value.is_finite() => Ok(()),
            TreeNode::Leaf { .. } => Err(PipelineError::CorruptArtifact(
                "tree leaf holds a non-finite value".to_string(),
            )),
            TreeNode::Split {
                feature,
                left,
                right,
                ..
            } => {
                if *feature >= n_features {
                    return Err(PipelineError::CorruptArtifact(format!(
                        "tree splits on feature {} of {}",
                        feature, n_features
                    )));
                }
                left.check(n_features)?;
                right.check(n_features)
            }
        }
    }
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
    n_features: usize,
}

impl RegressionTree {
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    /// Predict without the width check; callers guarantee `row.len() == n_features`.
    pub(crate) fn predict_row(&self, row: &[f32]) -> f64 {
        self.root.predict(row)
    }
}

impl Model for RegressionTree {
    const KIND: &'static str = "regression_tree";

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f32]) -> Result<f32> {
        check_width(self.n_features, features)?;
        Ok(self.predict_row(features) as f32)
    }

    fn validate(&self) -> Result<()> {
        self.root.check(self.n_features)
    }
}

/// Trainer for a single regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionTreeTrainer {
    /// Maximum depth; a depth of 0 is a single leaf.
    pub max_depth: usize,
    /// Minimum number of rows in each child.
    pub min_samples_leaf: usize,
    /// Minimum number of rows a node needs to be considered for a split.
    pub min_samples_split: usize,
}

impl Default for RegressionTreeTrainer {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_leaf: 1,
            min_samples_split: 2,
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTreeTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    pub(crate) fn check_params(&self) -> Result<()> {
        if self.min_samples_leaf == 0 {
            return Err(PipelineError::InvalidParameter(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::InvalidParameter(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Grow a tree on the rows in `indices`. Inputs are assumed validated.
    pub(crate) fn build(
        &self,
        x: &[FeatureVector],
        y: &[f64],
        indices: &[usize],
        n_features: usize,
    ) -> RegressionTree {
        RegressionTree {
            root: self.grow(x, y, indices, n_features, 0),
            n_features,
        }
    }

    fn grow(
        &self,
        x: &[FeatureVector],
        y: &[f64],
        indices: &[usize],
        n_features: usize,
        depth: usize,
    ) -> TreeNode {
        let n_samples = indices.len();
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let leaf = TreeNode::Leaf {
            value: sum / n_samples as f64,
            n_samples,
        };

        if depth >= self.max_depth
            || n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
        {
            return leaf;
        }

        let Some(best) = self.find_best_split(x, y, indices, n_features, sum) else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| f64::from(x[i][best.feature]) <= best.threshold);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(x, y, &left, n_features, depth + 1)),
            right: Box::new(self.grow(x, y, &right, n_features, depth + 1)),
            n_samples,
        }
    }

    fn find_best_split(
        &self,
        x: &[FeatureVector],
        y: &[f64],
        indices: &[usize],
        n_features: usize,
        total_sum: f64,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let parent_score = total_sum * total_sum / n as f64;

        let per_feature: Vec<Option<BestSplit>> = (0..n_features)
            .into_par_iter()
            .map(|feature| {
                let mut column: Vec<(f32, f64)> =
                    indices.iter().map(|&i| (x[i][feature], y[i])).collect();
                column.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut best: Option<BestSplit> = None;
                let mut left_sum = 0.0f64;
                for k in 0..n - 1 {
                    left_sum += column[k].1;
                    let n_left = k + 1;
                    let n_right = n - n_left;
                    if column[k].0 == column[k + 1].0
                        || n_left < self.min_samples_leaf
                        || n_right < self.min_samples_leaf
                    {
                        continue;
                    }
                    let right_sum = total_sum - left_sum;
                    // Reduction in squared error relative to the parent.
                    let gain = left_sum * left_sum / n_left as f64
                        + right_sum * right_sum / n_right as f64
                        - parent_score;
                    if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                        let lo = f64::from(column[k].0);
                        let threshold = (lo + f64::from(column[k + 1].0)) / 2.0;
                        // Both children must be non-empty.
                        if !(threshold >= lo && threshold < f64::from(column[k + 1].0)) {
                            continue;
                        }
                        best = Some(BestSplit {
                            feature,
                            threshold,
                            gain,
                        });
                    }
                }
                best
            })
            .collect();

        // Strict comparison keeps the lowest feature index on ties.
        per_feature.into_iter().flatten().fold(None, |acc, cand| match acc {
            Some(b) if cand.gain <= b.gain => Some(b),
            _ => Some(cand),
        })
    }
}

impl Trainer for RegressionTreeTrainer {
    type Model = RegressionTree;

    fn fit(&self, features: &[FeatureVector], labels: &[f32]) -> Result<Self::Model> {
        self.check_params()?;
        let n_features = check_training_data(features, labels)?;
        let y: Vec<f64> = labels.iter().map(|&v| f64::from(v)).collect();
        let indices: Vec<usize> = (0..features.len()).collect();
        Ok(self.build(features, &y, &indices, n_features))
    }
}
