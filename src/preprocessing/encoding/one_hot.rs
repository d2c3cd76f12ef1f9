//! One-hot encoding for categorical fields.
//!
//! Replaces each string field with an indicator vector over the categories
//! seen during fitting.

use crate::dataset::{Field, FieldType, Record, Schema};
use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const STAGE_NAME: &str = "OneHotEncoder";

/// Frozen mapping from category string to slot index.
///
/// Categories are kept sorted, so the index of a category is its position in
/// lexicographic order and does not depend on training row order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalVocabulary {
    categories: Vec<String>,
}

impl CategoricalVocabulary {
    /// Build a vocabulary from observed values.
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<&str> = values.into_iter().collect();
        Self {
            categories: unique.into_iter().map(str::to_string).collect(),
        }
    }

    /// Rebuild from stored categories, which must be strictly increasing.
    fn from_sorted(categories: Vec<String>) -> Result<Self> {
        if categories.is_empty() {
            return Err(PipelineError::CorruptArtifact(
                "empty categorical vocabulary".to_string(),
            ));
        }
        if categories.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PipelineError::CorruptArtifact(
                "categorical vocabulary is not sorted and unique".to_string(),
            ));
        }
        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
    }

    /// Indicator vector for `category`; all zeros if it was never seen.
    pub fn encode(&self, category: &str) -> Vec<f32> {
        let mut indicator = vec![0.0f32; self.categories.len()];
        if let Some(idx) = self.index_of(category) {
            indicator[idx] = 1.0;
        }
        indicator
    }
}

/// One-hot encoder for categorical fields.
///
/// Each configured field is scanned during fitting and a
/// [`CategoricalVocabulary`] is built for it. Applying the fitted encoder
/// replaces the field with a vector of `vocabulary.len()` slots.
///
/// # Example
/// ```ignore
/// use taxi_fares::preprocessing::{OneHotEncoder, Transformer, FittedTransformer};
///
/// // vendor_id values: "CMT", "VTS"
/// let fitted = OneHotEncoder::new(["vendor_id"]).fit(&schema, &records)?;
///
/// // "VTS" -> [0.0, 1.0], unseen "DDS" -> [0.0, 0.0]
/// let encoded = fitted.apply(record)?;
/// ```
#[derive(Clone, Debug)]
pub struct OneHotEncoder {
    columns: Vec<String>,
}

impl OneHotEncoder {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Serializable parameters for a fitted OneHotEncoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoderParams {
    /// Encoded fields, in configuration order.
    pub columns: Vec<String>,
    /// Sorted categories per field.
    pub categories: Vec<Vec<String>>,
}

/// Fitted OneHotEncoder ready for inference.
#[derive(Clone, Debug)]
pub struct FittedOneHotEncoder {
    columns: Vec<String>,
    vocabularies: Vec<CategoricalVocabulary>,
}

impl FittedOneHotEncoder {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Vocabulary learned for `column`.
    pub fn vocabulary(&self, column: &str) -> Option<&CategoricalVocabulary> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.vocabularies[i])
    }

    /// Total number of indicator slots across all encoded fields.
    pub fn n_features_out(&self) -> usize {
        self.vocabularies.iter().map(CategoricalVocabulary::len).sum()
    }
}

fn require_categorical<'a>(schema: &'a Schema, column: &str) -> Result<&'a Field> {
    let field = schema.require(STAGE_NAME, column)?;
    if field.ty != FieldType::Categorical {
        return Err(PipelineError::wrong_type(column, FieldType::Categorical, &field.ty));
    }
    Ok(field)
}

impl Transformer for OneHotEncoder {
    type Fitted = FittedOneHotEncoder;

    fn fit(&self, schema: &Schema, records: &[Record]) -> Result<Self::Fitted> {
        if self.columns.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "OneHotEncoder needs at least one column".to_string(),
            ));
        }
        if records.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "cannot fit OneHotEncoder on empty data".to_string(),
            ));
        }

        let mut vocabularies = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            require_categorical(schema, column)?;
            let values = records
                .iter()
                .map(|r| r.text(column))
                .collect::<Result<Vec<&str>>>()?;
            vocabularies.push(CategoricalVocabulary::from_values(values));
        }

        Ok(FittedOneHotEncoder {
            columns: self.columns.clone(),
            vocabularies,
        })
    }
}

impl FittedTransformer for FittedOneHotEncoder {
    type Params = OneHotEncoderParams;

    fn step_name(&self) -> &'static str {
        STAGE_NAME
    }

    fn output_schema(&self, input: &Schema) -> Result<Schema> {
        let mut schema = input.clone();
        for (column, vocabulary) in self.columns.iter().zip(&self.vocabularies) {
            let role = require_categorical(&schema, column)?.role;
            schema = schema.with_field(Field {
                name: column.clone(),
                ty: FieldType::Vector {
                    len: vocabulary.len(),
                },
                role,
            });
        }
        Ok(schema)
    }

    fn apply(&self, mut record: Record) -> Result<Record> {
        for (column, vocabulary) in self.columns.iter().zip(&self.vocabularies) {
            let indicator = vocabulary.encode(record.text(column)?);
            record.insert(column.clone(), indicator);
        }
        Ok(record)
    }

    fn extract_params(&self) -> Self::Params {
        OneHotEncoderParams {
            columns: self.columns.clone(),
            categories: self
                .vocabularies
                .iter()
                .map(|v| v.categories().to_vec())
                .collect(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self> {
        if params.columns.is_empty() || params.columns.len() != params.categories.len() {
            return Err(PipelineError::CorruptArtifact(format!(
                "OneHotEncoder has {} columns but {} vocabularies",
                params.columns.len(),
                params.categories.len()
            )));
        }
        let vocabularies = params
            .categories
            .into_iter()
            .map(CategoricalVocabulary::from_sorted)
            .collect::<Result<Vec<_>>>()?;

        Ok(FittedOneHotEncoder {
            columns: params.columns,
            vocabularies,
        })
    }
}
