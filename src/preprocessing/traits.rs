//! Core traits for pipeline stages.
//!
//! This module defines the two central traits:
//! - [`Transformer`]: Unfitted configuration; learns state from a training batch.
//! - [`FittedTransformer`]: After fitting; applies frozen state to any record.

use crate::dataset::{Record, Schema};
use crate::error::Result;
use crate::serialization::SerializableParams;

/// Trait for unfitted stages.
///
/// An unfitted stage holds only configuration (which fields to read and
/// write). Calling [`fit`](Transformer::fit) once produces the fitted stage
/// carrying everything learned from the training batch.
///
/// # Example
/// ```ignore
/// use taxi_fares::preprocessing::{OneHotEncoder, Transformer, FittedTransformer};
///
/// let encoder = OneHotEncoder::new(["vendor_id"]);
/// let fitted = encoder.fit(dataset.schema(), dataset.records())?;
/// let encoded = fitted.apply(record)?;
/// ```
pub trait Transformer: Clone {
    /// The fitted stage type ready for inference.
    type Fitted: FittedTransformer;

    /// Fit the stage on a training batch described by `schema`.
    ///
    /// # Errors
    /// - `Schema` if a referenced field is absent from `schema`
    /// - `Type` if a referenced field has the wrong type
    /// - `EmptyDataset` if the stage learns from data and `records` is empty
    fn fit(&self, schema: &Schema, records: &[Record]) -> Result<Self::Fitted>;

    /// Fit the stage, then apply it to the same batch.
    ///
    /// Returns the fitted stage, the output schema and the transformed records.
    fn fit_transform(
        &self,
        schema: &Schema,
        records: Vec<Record>,
    ) -> Result<(Self::Fitted, Schema, Vec<Record>)> {
        let fitted = self.fit(schema, &records)?;
        let output_schema = fitted.output_schema(schema)?;
        let transformed = fitted.apply_batch(records)?;
        Ok((fitted, output_schema, transformed))
    }
}

/// Trait for fitted stages.
///
/// A fitted stage never mutates itself: [`apply`](FittedTransformer::apply)
/// is a pure function of the record and the frozen state, so one instance
/// can serve many threads.
///
/// # Guarantees
/// - `extract_params()` + `from_params()` is a round-trip.
pub trait FittedTransformer: Clone + Send + Sync {
    /// Serializable representation of the fitted state.
    type Params: SerializableParams;

    /// Stage name for logging and artifact checks.
    fn step_name(&self) -> &'static str;

    /// Describe the records this stage produces from records described by `input`.
    fn output_schema(&self, input: &Schema) -> Result<Schema>;

    /// Transform one record using the fitted state.
    fn apply(&self, record: Record) -> Result<Record>;

    /// Transform a batch, failing on the first bad record.
    fn apply_batch(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        records.into_iter().map(|r| self.apply(r)).collect()
    }

    /// Extract fitted state as a serializable representation.
    fn extract_params(&self) -> Self::Params;

    /// Reconstruct a fitted stage from parameters.
    fn from_params(params: Self::Params) -> Result<Self>
    where
        Self: Sized;
}
