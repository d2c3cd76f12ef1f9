//! Regression trainers and the models they produce.
//!
//! A [`Trainer`] holds hyperparameters only; [`Trainer::fit`] consumes a
//! feature matrix and label vector and returns a [`Model`], which holds only
//! what inference needs. Fitted models are free from training hyperparameters.
//!
//! ## Trainers
//! - [`FastTreeRegressor`]: gradient-boosted regression trees (default)
//! - [`RegressionTreeTrainer`]: a single CART regression tree
//! - [`LinearRegressor`]: linear regression by full-batch gradient descent

use crate::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod boosting;
pub mod linear;
pub mod tree;

pub use boosting::{BoostedTreesModel, FastTreeRegressor};
pub use linear::{LinearModel, LinearRegressor};
pub use tree::{RegressionTree, RegressionTreeTrainer, TreeNode};

/// Ordered numeric features of one record.
pub type FeatureVector = Vec<f32>;

/// Learns a [`Model`] from feature vectors and labels.
pub trait Trainer: Clone {
    type Model: Model;

    /// Fit on `features` (one row per record) and `labels` (same length).
    ///
    /// # Errors
    /// - `EmptyDataset` if there are no rows
    /// - `DimensionMismatch` for ragged rows or a label count that differs from the row count
    /// - `Type` for a NaN or infinite feature or label
    /// - `InvalidParameter` for unusable hyperparameters
    fn fit(&self, features: &[FeatureVector], labels: &[f32]) -> Result<Self::Model>;
}

/// A fitted regressor mapping one feature vector to a scalar.
pub trait Model: Clone + Send + Sync + Serialize + DeserializeOwned {
    /// Tag stored in artifacts so a file is never decoded as the wrong model.
    const KIND: &'static str;

    /// Feature vector length the model was fit on.
    fn n_features(&self) -> usize;

    /// Predict for one feature vector.
    ///
    /// # Errors
    /// `DimensionMismatch` if `features.len() != self.n_features()`.
    fn predict(&self, features: &[f32]) -> Result<f32>;

    /// Check internal consistency after decoding.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Validate a training matrix and return its row width.
pub(crate) fn check_training_data(features: &[FeatureVector], labels: &[f32]) -> Result<usize> {
    let first = features.first().ok_or_else(|| {
        PipelineError::EmptyDataset("cannot train on zero feature vectors".to_string())
    })?;
    if labels.len() != features.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: features.len(),
            got: labels.len(),
        });
    }
    let width = first.len();
    if let Some(row) = features.iter().find(|row| row.len() != width) {
        return Err(PipelineError::DimensionMismatch {
            expected: width,
            got: row.len(),
        });
    }
    if let Some(v) = features.iter().flatten().find(|v| !v.is_finite()) {
        return Err(PipelineError::wrong_type("features", "finite numeric", v));
    }
    if let Some(v) = labels.iter().find(|v| !v.is_finite()) {
        return Err(PipelineError::wrong_type("label", "finite numeric", v));
    }
    Ok(width)
}

pub(crate) fn check_width(expected: usize, features: &[f32]) -> Result<()> {
    if features.len() != expected {
        return Err(PipelineError::DimensionMismatch {
            expected,
            got: features.len(),
        });
    }
    Ok(())
}
