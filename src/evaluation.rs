//! Regression metrics for a fitted pipeline on labelled data.

use crate::dataset::{Dataset, Record};
use crate::error::{PipelineError, Result};
use crate::model::Model;
use crate::pipeline::FittedPipeline;
use rayon::prelude::*;
use std::fmt;
use tracing::{info, warn};

/// Coefficient of determination.
///
/// Undefined when every label is identical, since the total sum of squares
/// is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RSquared {
    Defined(f64),
    Undefined,
}

impl RSquared {
    pub fn value(&self) -> Option<f64> {
        match self {
            RSquared::Defined(v) => Some(*v),
            RSquared::Undefined => None,
        }
    }
}

impl fmt::Display for RSquared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RSquared::Defined(v) => write!(f, "{:.4}", v),
            RSquared::Undefined => write!(f, "undefined"),
        }
    }
}

/// Point metrics over paired actual and predicted values.
pub struct Metrics;

impl Metrics {
    fn check(y_true: &[f32], y_pred: &[f32]) -> Result<()> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: y_true.len(),
                got: y_pred.len(),
            });
        }
        if y_true.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "cannot compute metrics on zero records".to_string(),
            ));
        }
        Ok(())
    }

    /// Mean absolute error (L1).
    pub fn mae(y_true: &[f32], y_pred: &[f32]) -> Result<f64> {
        Self::check(y_true, y_pred)?;
        let sum: f64 = y_true
            .iter()
            .zip(y_pred)
            .map(|(&t, &p)| (f64::from(t) - f64::from(p)).abs())
            .sum();
        Ok(sum / y_true.len() as f64)
    }

    /// Mean squared error (L2).
    pub fn mse(y_true: &[f32], y_pred: &[f32]) -> Result<f64> {
        Self::check(y_true, y_pred)?;
        Ok(sum_sq_residuals(y_true, y_pred) / y_true.len() as f64)
    }

    pub fn rmse(y_true: &[f32], y_pred: &[f32]) -> Result<f64> {
        Self::mse(y_true, y_pred).map(f64::sqrt)
    }

    /// R² = 1 - SS_res / SS_tot.
    pub fn r_squared(y_true: &[f32], y_pred: &[f32]) -> Result<RSquared> {
        Self::check(y_true, y_pred)?;
        let n = y_true.len() as f64;
        let mean = y_true.iter().map(|&t| f64::from(t)).sum::<f64>() / n;
        let ss_tot: f64 = y_true
            .iter()
            .map(|&t| (f64::from(t) - mean).powi(2))
            .sum();
        if ss_tot == 0.0 {
            return Ok(RSquared::Undefined);
        }
        Ok(RSquared::Defined(1.0 - sum_sq_residuals(y_true, y_pred) / ss_tot))
    }
}

fn sum_sq_residuals(y_true: &[f32], y_pred: &[f32]) -> f64 {
    y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (f64::from(t) - f64::from(p)).powi(2))
        .sum()
}

/// Summary of a pipeline's accuracy on one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionMetrics {
    pub n_samples: usize,
    /// Mean absolute error (L1).
    pub mae: f64,
    /// Mean squared error (L2).
    pub mse: f64,
    pub rmse: f64,
    pub r_squared: RSquared,
}

impl RegressionMetrics {
    pub fn from_predictions(y_true: &[f32], y_pred: &[f32]) -> Result<Self> {
        let mse = Metrics::mse(y_true, y_pred)?;
        Ok(Self {
            n_samples: y_true.len(),
            mae: Metrics::mae(y_true, y_pred)?,
            mse,
            rmse: mse.sqrt(),
            r_squared: Metrics::r_squared(y_true, y_pred)?,
        })
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Metrics over {} samples", self.n_samples)?;
        writeln!(f, "  R2 Score:                {}", self.r_squared)?;
        writeln!(f, "  Mean Absolute Error:     {:.4}", self.mae)?;
        writeln!(f, "  Mean Squared Error:      {:.4}", self.mse)?;
        write!(f, "  Root Mean Squared Error: {:.4}", self.rmse)
    }
}

/// Scores a fitted pipeline against labelled records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionEvaluator;

impl RegressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Predict every record and compare against its label.
    ///
    /// # Errors
    /// - `EmptyDataset` if `dataset` has no records
    /// - `Schema` if a record lacks the label
    pub fn evaluate<M: Model>(
        &self,
        pipeline: &FittedPipeline<M>,
        dataset: &Dataset,
    ) -> Result<RegressionMetrics> {
        self.evaluate_records(pipeline, dataset.records())
    }

    pub fn evaluate_records<M: Model>(
        &self,
        pipeline: &FittedPipeline<M>,
        records: &[Record],
    ) -> Result<RegressionMetrics> {
        if records.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "cannot evaluate on zero records".to_string(),
            ));
        }

        let pairs = records
            .par_iter()
            .map(|record| -> Result<(f32, f32)> {
                let transformed = pipeline.transform(record)?;
                let actual = transformed.number(pipeline.label_column())?;
                let features = transformed.vector(pipeline.features_column())?;
                Ok((actual, pipeline.model().predict(features)?))
            })
            .collect::<Result<Vec<(f32, f32)>>>()?;
        let (actual, predicted): (Vec<f32>, Vec<f32>) = pairs.into_iter().unzip();

        let metrics = RegressionMetrics::from_predictions(&actual, &predicted)?;
        if metrics.r_squared == RSquared::Undefined {
            warn!(
                n_samples = metrics.n_samples,
                "all labels are identical; R-squared is undefined"
            );
        }
        info!(
            n_samples = metrics.n_samples,
            mae = metrics.mae,
            rmse = metrics.rmse,
            "evaluated pipeline"
        );
        Ok(metrics)
    }
}
