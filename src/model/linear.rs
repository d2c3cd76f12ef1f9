//! Linear regression.
//!
//! - [`LinearRegressor`]: training hyperparameters only.
//! - [`LinearModel`]: inference-only, serializable predictor.
//!
//! Training is full-batch gradient descent on the mean squared error,
//! starting from zero weights, so a given dataset always yields the same model.

use crate::error::{PipelineError, Result};
use crate::model::{check_training_data, check_width, FeatureVector, Model, Trainer};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gradient-descent trainer for [`LinearModel`].
///
/// Defaults:
/// - `learning_rate`: 0.01
/// - `max_epochs`: 1000
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearRegressor {
    pub learning_rate: f64,
    pub max_epochs: usize,
}

impl Default for LinearRegressor {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            max_epochs: 1000,
        }
    }
}

impl LinearRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }
}

/// Fitted linear model: `prediction = weights · features + bias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl Model for LinearModel {
    const KIND: &'static str = "linear";

    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, features: &[f32]) -> Result<f32> {
        check_width(self.weights.len(), features)?;
        let dot: f64 = self
            .weights
            .iter()
            .zip(features)
            .map(|(&w, &x)| f64::from(w) * f64::from(x))
            .sum();
        Ok((dot + f64::from(self.bias)) as f32)
    }

    fn validate(&self) -> Result<()> {
        if self.weights.iter().chain(Some(&self.bias)).all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(PipelineError::CorruptArtifact(
                "linear model has non-finite coefficients".to_string(),
            ))
        }
    }
}

impl Trainer for LinearRegressor {
    type Model = LinearModel;

    fn fit(&self, features: &[FeatureVector], labels: &[f32]) -> Result<Self::Model> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        let n_features = check_training_data(features, labels)?;
        let n = features.len() as f64;

        let mut weights = vec![0.0f64; n_features];
        let mut bias = 0.0f64;
        let mut grad_w = vec![0.0f64; n_features];

        for epoch in 0..self.max_epochs {
            grad_w.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0f64;
            let mut loss = 0.0f64;

            for (row, &label) in features.iter().zip(labels) {
                let pred: f64 = row
                    .iter()
                    .zip(&weights)
                    .map(|(&x, w)| f64::from(x) * w)
                    .sum::<f64>()
                    + bias;
                let err = pred - f64::from(label);
                loss += err * err;
                for (g, &x) in grad_w.iter_mut().zip(row) {
                    *g += err * f64::from(x);
                }
                grad_b += err;
            }

            let scale = 2.0 / n;
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * scale * g;
            }
            bias -= self.learning_rate * scale * grad_b;

            if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
                return Err(PipelineError::InvalidParameter(format!(
                    "gradient descent diverged at epoch {} (learning_rate {})",
                    epoch, self.learning_rate
                )));
            }
            if epoch % 100 == 0 {
                debug!(epoch, loss = loss / n, "linear regression epoch");
            }
        }

        Ok(LinearModel {
            weights: weights.into_iter().map(|w| w as f32).collect(),
            bias: bias as f32,
        })
    }
}
