//! Record datasets for training, evaluation and inference.
//!
//! This module provides the typed row representation used by every pipeline
//! stage and a [`Dataset`] that pairs a batch of records with the [`Schema`]
//! they conform to.
//!
//! # Core Concepts
//!
//! - **Record**: one trip, a mapping from field name to [`Value`].
//! - **Schema**: ordered `(name, type, role)` triples describing a batch.
//! - **Label**: the single field in the [`FieldRole::Label`] role, the fare.
//!
//! # Example
//!
//! ```rust
//! use taxi_fares::dataset::{Dataset, Field, Record, Schema};
//!
//! let schema = Schema::new(vec![
//!     Field::categorical("vendor_id"),
//!     Field::label("fare_amount"),
//! ]).unwrap();
//! let records = vec![Record::new().with("vendor_id", "CMT").with("fare_amount", 10.0f32)];
//! let dataset = Dataset::new(schema, records).unwrap();
//! assert_eq!(dataset.len(), 1);
//! ```

pub mod record;
pub mod schema;
pub mod taxi;

pub use self::record::{Record, Value};
pub use self::schema::{Field, FieldRole, FieldType, Schema};
pub use self::taxi::TaxiTrip;

use crate::error::{PipelineError, Result};

/// A batch of records together with the schema they were validated against.
#[derive(Clone, Debug)]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
}

impl Dataset {
    /// Create a dataset, validating every record against `schema`.
    ///
    /// Records may carry extra fields the schema does not mention.
    pub fn new(schema: Schema, records: Vec<Record>) -> Result<Self> {
        for record in &records {
            schema.validate(record)?;
        }
        Ok(Self { schema, records })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of the label field, in record order.
    pub fn labels(&self) -> Result<Vec<f32>> {
        let label = self
            .schema
            .labels()
            .next()
            .ok_or_else(|| PipelineError::Schema("dataset has no label field".to_string()))?;
        self.records.iter().map(|r| r.number(&label.name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![Field::numeric("trip_distance"), Field::label("fare_amount")]).unwrap()
    }

    #[test]
    fn test_dataset_validates_records() {
        let records = vec![Record::new().with("trip_distance", 1.0f32)];
        let result = Dataset::new(schema(), records);
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }

    #[test]
    fn test_dataset_labels() {
        let records = vec![
            Record::new().with("trip_distance", 1.0f32).with("fare_amount", 5.0f32),
            Record::new().with("trip_distance", 2.0f32).with("fare_amount", 9.5f32),
        ];
        let dataset = Dataset::new(schema(), records).unwrap();
        assert_eq!(dataset.labels().unwrap(), vec![5.0, 9.5]);
    }

    #[test]
    fn test_dataset_without_label_field() {
        let schema = Schema::new(vec![Field::numeric("trip_distance")]).unwrap();
        let dataset = Dataset::new(schema, vec![]).unwrap();
        assert!(dataset.is_empty());
        assert!(matches!(dataset.labels(), Err(PipelineError::Schema(_))));
    }
}
