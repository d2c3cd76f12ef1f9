//! Train, persist, evaluate and predict behind one handle.

use crate::dataset::{Dataset, Record};
use crate::error::{PipelineError, Result};
use crate::evaluation::{RegressionEvaluator, RegressionMetrics};
use crate::model::Trainer;
use crate::pipeline::{FittedPipeline, Pipeline};
use crate::store::ModelStore;
use std::path::Path;

/// Owns a pipeline configuration and, once trained or loaded, its fitted form.
///
/// # Example
/// ```ignore
/// use taxi_fares::engine::PredictionEngine;
/// use taxi_fares::model::FastTreeRegressor;
/// use taxi_fares::pipeline::Pipeline;
///
/// let mut engine = PredictionEngine::new(Pipeline::taxi_fares(FastTreeRegressor::default()));
/// engine.train(&train)?;
/// engine.save("Data/model.zip")?;
/// let metrics = engine.evaluate(&test)?;
/// let fare = engine.predict(&TaxiTrip::sample().to_record())?;
/// ```
pub struct PredictionEngine<T: Trainer> {
    pipeline: Pipeline<T>,
    fitted: Option<FittedPipeline<T::Model>>,
}

impl<T: Trainer> PredictionEngine<T> {
    pub fn new(pipeline: Pipeline<T>) -> Self {
        Self {
            pipeline,
            fitted: None,
        }
    }

    pub fn pipeline(&self) -> &Pipeline<T> {
        &self.pipeline
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// The fitted pipeline.
    ///
    /// # Errors
    /// `NotFitted` before [`train`](Self::train) or [`load`](Self::load).
    pub fn fitted(&self) -> Result<&FittedPipeline<T::Model>> {
        self.fitted.as_ref().ok_or_else(|| {
            PipelineError::NotFitted("train or load a model before using it".to_string())
        })
    }

    /// Fit the pipeline, replacing any previously fitted state.
    pub fn train(&mut self, dataset: &Dataset) -> Result<&FittedPipeline<T::Model>> {
        let fitted = self.pipeline.fit(dataset)?;
        Ok(self.fitted.insert(fitted))
    }

    /// Load a saved pipeline whose stages match this engine's configuration.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<&FittedPipeline<T::Model>> {
        let fitted = ModelStore::load_expecting(path, &self.pipeline.stage_kinds())?;
        Ok(self.fitted.insert(fitted))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        ModelStore::save(self.fitted()?, path)
    }

    pub fn evaluate(&self, dataset: &Dataset) -> Result<RegressionMetrics> {
        RegressionEvaluator::new().evaluate(self.fitted()?, dataset)
    }

    pub fn predict(&self, record: &Record) -> Result<f32> {
        self.fitted()?.predict(record)
    }

    pub fn predict_batch(&self, records: &[Record]) -> Result<Vec<f32>> {
        self.fitted()?.predict_batch(records)
    }
}
