//! Column concatenation (vector assembly).
//!
//! Flattens numeric and vector fields into a single feature vector in the
//! declared source order.

use crate::dataset::{Field, FieldType, Record, Schema, Value};
use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};

const STAGE_NAME: &str = "ColumnConcatenator";

/// Unfitted concatenator: an output field name and its ordered sources.
#[derive(Clone, Debug)]
pub struct ColumnConcatenator {
    output: String,
    sources: Vec<String>,
}

impl ColumnConcatenator {
    pub fn new<I, S>(output: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: output.into(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

/// A source field and the type it had at fit time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatSource {
    pub name: String,
    pub ty: FieldType,
}

impl ConcatSource {
    fn width(&self) -> usize {
        self.ty.width().unwrap_or(0)
    }
}

/// Serializable parameters for a fitted ColumnConcatenator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnConcatenatorParams {
    pub output: String,
    pub sources: Vec<ConcatSource>,
}

/// Fitted ColumnConcatenator ready for inference.
#[derive(Clone, Debug)]
pub struct FittedColumnConcatenator {
    output: String,
    sources: Vec<ConcatSource>,
    width: usize,
}

impl FittedColumnConcatenator {
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn sources(&self) -> &[ConcatSource] {
        &self.sources
    }

    /// Length of the assembled vector.
    pub fn n_features_out(&self) -> usize {
        self.width
    }

    /// Type recorded for `name` at fit time.
    pub fn source_type(&self, name: &str) -> Option<&FieldType> {
        self.sources.iter().find(|s| s.name == name).map(|s| &s.ty)
    }

    fn build(output: String, sources: Vec<ConcatSource>) -> Self {
        let width = sources.iter().map(ConcatSource::width).sum();
        Self {
            output,
            sources,
            width,
        }
    }
}

fn check_source(field: &Field) -> Result<()> {
    if field.is_label() {
        return Err(PipelineError::Schema(format!(
            "{} cannot use label field '{}' as a feature",
            STAGE_NAME, field.name
        )));
    }
    if field.ty.width().is_none() {
        return Err(PipelineError::wrong_type(
            &field.name,
            "numeric or vector",
            &field.ty,
        ));
    }
    Ok(())
}

impl Transformer for ColumnConcatenator {
    type Fitted = FittedColumnConcatenator;

    fn fit(&self, schema: &Schema, _records: &[Record]) -> Result<Self::Fitted> {
        if self.sources.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "ColumnConcatenator needs at least one source".to_string(),
            ));
        }

        let mut sources = Vec::with_capacity(self.sources.len());
        for name in &self.sources {
            let field = schema.require(STAGE_NAME, name)?;
            check_source(field)?;
            sources.push(ConcatSource {
                name: name.clone(),
                ty: field.ty.clone(),
            });
        }

        Ok(FittedColumnConcatenator::build(self.output.clone(), sources))
    }
}

impl FittedTransformer for FittedColumnConcatenator {
    type Params = ColumnConcatenatorParams;

    fn step_name(&self) -> &'static str {
        STAGE_NAME
    }

    fn output_schema(&self, input: &Schema) -> Result<Schema> {
        for source in &self.sources {
            let field = input.require(STAGE_NAME, &source.name)?;
            check_source(field)?;
            if field.ty != source.ty {
                return Err(match (&field.ty, &source.ty) {
                    (FieldType::Vector { len: got }, FieldType::Vector { len: expected }) => {
                        PipelineError::DimensionMismatch {
                            expected: *expected,
                            got: *got,
                        }
                    }
                    _ => PipelineError::wrong_type(&source.name, &source.ty, &field.ty),
                });
            }
        }
        Ok(input.clone().with_field(Field::vector(&self.output, self.width)))
    }

    fn apply(&self, mut record: Record) -> Result<Record> {
        let mut features = Vec::with_capacity(self.width);
        for source in &self.sources {
            let value = record
                .get(&source.name)
                .ok_or_else(|| PipelineError::missing_field(STAGE_NAME, &source.name))?;
            match (&source.ty, value) {
                (FieldType::Numeric, Value::Number(v)) => features.push(*v),
                (FieldType::Vector { len }, Value::Vector(v)) => {
                    if v.len() != *len {
                        return Err(PipelineError::DimensionMismatch {
                            expected: *len,
                            got: v.len(),
                        });
                    }
                    features.extend_from_slice(v);
                }
                (ty, other) => {
                    return Err(PipelineError::wrong_type(&source.name, ty, other.type_name()))
                }
            }
        }
        record.insert(self.output.clone(), features);
        Ok(record)
    }

    fn extract_params(&self) -> Self::Params {
        ColumnConcatenatorParams {
            output: self.output.clone(),
            sources: self.sources.clone(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self> {
        if params.sources.is_empty() {
            return Err(PipelineError::CorruptArtifact(
                "ColumnConcatenator has no sources".to_string(),
            ));
        }
        if let Some(bad) = params.sources.iter().find(|s| s.ty.width().is_none()) {
            return Err(PipelineError::CorruptArtifact(format!(
                "ColumnConcatenator source '{}' has non-numeric type {}",
                bad.name, bad.ty
            )));
        }
        Ok(FittedColumnConcatenator::build(params.output, params.sources))
    }
}
