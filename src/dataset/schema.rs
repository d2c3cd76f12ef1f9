//! Ordered field descriptions threaded through the pipeline.
//!
//! A [`Schema`] describes the records at one stage boundary. Each stage maps
//! its input schema to an output schema, so a field a stage needs but nobody
//! produces is reported before any record is touched.

use crate::dataset::record::{Record, Value};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime type of a field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Single `f32` value.
    Numeric,
    /// String category.
    Categorical,
    /// Fixed-length `f32` vector.
    Vector { len: usize },
}

impl FieldType {
    /// Number of feature slots a value of this type occupies, if it is numeric.
    pub fn width(&self) -> Option<usize> {
        match self {
            FieldType::Numeric => Some(1),
            FieldType::Vector { len } => Some(*len),
            FieldType::Categorical => None,
        }
    }

    /// Whether `value` has this type. Finiteness is checked separately.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Numeric, Value::Number(_)) => true,
            (FieldType::Categorical, Value::Text(_)) => true,
            (FieldType::Vector { len }, Value::Vector(v)) => v.len() == *len,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Numeric => write!(f, "numeric"),
            FieldType::Categorical => write!(f, "categorical"),
            FieldType::Vector { len } => write!(f, "vector[{}]", len),
        }
    }
}

/// Whether a field is an input feature or the prediction target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldRole {
    #[default]
    Feature,
    Label,
}

/// A named, typed field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub role: FieldRole,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            role: FieldRole::Feature,
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Numeric)
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Categorical)
    }

    pub fn vector(name: impl Into<String>, len: usize) -> Self {
        Self::new(name, FieldType::Vector { len })
    }

    /// A numeric label field.
    pub fn label(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: FieldType::Numeric,
            role: FieldRole::Label,
        }
    }

    pub fn is_label(&self) -> bool {
        self.role == FieldRole::Label
    }
}

/// Ordered list of fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Build a schema, rejecting duplicate names.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(PipelineError::InvalidParameter(format!(
                    "duplicate field '{}' in schema",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    /// Build a schema from fields whose names are known to be distinct.
    pub(crate) fn from_unique(fields: Vec<Field>) -> Self {
        debug_assert!(Self::new(fields.clone()).is_ok());
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Look up a field a stage depends on.
    pub fn require(&self, stage: &str, name: &str) -> Result<&Field> {
        self.field(name)
            .ok_or_else(|| PipelineError::missing_field(stage, name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Fields in the label role.
    pub fn labels(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_label())
    }

    /// Replace a field of the same name in place, or append it.
    pub fn with_field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// The schema as seen on the inference path, where labels are optional.
    pub fn without_labels(&self) -> Self {
        Self {
            fields: self.fields.iter().filter(|f| !f.is_label()).cloned().collect(),
        }
    }

    /// Check that `record` carries every field with the declared type.
    ///
    /// Numeric values (and vector elements) must be finite: a NaN or infinite
    /// value is a `Type` error.
    pub fn validate(&self, record: &Record) -> Result<()> {
        for field in &self.fields {
            let value = record.get(&field.name).ok_or_else(|| {
                PipelineError::Schema(format!("record is missing field '{}'", field.name))
            })?;
            if !field.ty.matches(value) {
                return Err(PipelineError::wrong_type(
                    &field.name,
                    &field.ty,
                    value.type_name(),
                ));
            }
            if let Some(bad) = non_finite(value) {
                return Err(PipelineError::wrong_type(
                    &field.name,
                    format!("finite {}", field.ty),
                    bad,
                ));
            }
        }
        Ok(())
    }
}

fn non_finite(value: &Value) -> Option<f32> {
    match value {
        Value::Number(v) => Some(*v).filter(|v| !v.is_finite()),
        Value::Vector(v) => v.iter().copied().find(|v| !v.is_finite()),
        Value::Text(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip_schema() -> Schema {
        Schema::new(vec![
            Field::categorical("vendor_id"),
            Field::numeric("trip_distance"),
            Field::label("fare_amount"),
        ])
        .unwrap()
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let result = Schema::new(vec![Field::numeric("a"), Field::categorical("a")]);
        assert!(matches!(result, Err(PipelineError::InvalidParameter(_))));
    }

    #[test]
    fn test_with_field_replaces_in_place() {
        let schema = trip_schema().with_field(Field::vector("vendor_id", 3));
        assert_eq!(schema.names(), vec!["vendor_id", "trip_distance", "fare_amount"]);
        assert_eq!(
            schema.field("vendor_id").unwrap().ty,
            FieldType::Vector { len: 3 }
        );
    }

    #[test]
    fn test_with_field_appends() {
        let schema = trip_schema().with_field(Field::vector("Features", 4));
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.names()[3], "Features");
    }

    #[test]
    fn test_without_labels() {
        let schema = trip_schema().without_labels();
        assert_eq!(schema.names(), vec!["vendor_id", "trip_distance"]);
        assert_eq!(schema.labels().count(), 0);
    }

    #[test]
    fn test_validate_missing_field() {
        let record = Record::new()
            .with("vendor_id", Value::text("CMT"))
            .with("trip_distance", Value::Number(2.5));
        let result = trip_schema().validate(&record);
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }

    #[test]
    fn test_validate_wrong_type() {
        let record = Record::new()
            .with("vendor_id", Value::Number(1.0))
            .with("trip_distance", Value::Number(2.5))
            .with("fare_amount", Value::Number(10.0));
        let result = trip_schema().validate(&record);
        assert!(matches!(result, Err(PipelineError::Type { .. })));
    }

    #[test]
    fn test_vector_type_checks_length() {
        let ty = FieldType::Vector { len: 2 };
        assert!(ty.matches(&Value::Vector(vec![0.0, 1.0])));
        assert!(!ty.matches(&Value::Vector(vec![0.0])));
        assert_eq!(ty.width(), Some(2));
        assert_eq!(FieldType::Categorical.width(), None);
    }

    #[test]
    fn test_validate_rejects_non_finite_numbers() {
        let record = |distance: f32, fare: f32| {
            Record::new()
                .with("vendor_id", Value::text("CMT"))
                .with("trip_distance", Value::Number(distance))
                .with("fare_amount", Value::Number(fare))
        };
        let schema = trip_schema();
        assert!(schema.validate(&record(2.5, 10.0)).is_ok());

        match schema.validate(&record(f32::NAN, 10.0)) {
            Err(PipelineError::Type { field, got, .. }) => {
                assert_eq!(field, "trip_distance");
                assert_eq!(got, "NaN");
            }
            other => panic!("expected type error, got {:?}", other),
        }
        assert!(matches!(
            schema.validate(&record(2.5, f32::INFINITY)),
            Err(PipelineError::Type { .. })
        ));

        let vectors = Schema::new(vec![Field::vector("v", 2)]).unwrap();
        let bad = Record::new().with("v", Value::Vector(vec![1.0, f32::NAN]));
        assert!(matches!(vectors.validate(&bad), Err(PipelineError::Type { .. })));
    }
}
