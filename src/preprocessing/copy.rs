//! Column copy: duplicates fields under new names.
//!
//! Typically used to copy the raw fare into the canonical label column.

use crate::dataset::{Field, Record, Schema};
use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};

const STAGE_NAME: &str = "ColumnCopy";

/// Unfitted column copy: a list of `(source, target)` pairs applied in order.
#[derive(Clone, Debug)]
pub struct ColumnCopy {
    pairs: Vec<(String, String)>,
}

impl ColumnCopy {
    pub fn new<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(s, t)| (s.into(), t.into()))
                .collect(),
        }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// One fitted copy rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CopyRule {
    pub source: String,
    pub target: String,
    /// The source was the label (or copied from it) at fit time. Such a
    /// source may be absent at inference, in which case the copy is skipped.
    pub label: bool,
}

/// Serializable parameters for a fitted ColumnCopy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnCopyParams {
    pub rules: Vec<CopyRule>,
}

/// Fitted ColumnCopy ready for inference.
#[derive(Clone, Debug)]
pub struct FittedColumnCopy {
    rules: Vec<CopyRule>,
}

impl FittedColumnCopy {
    pub fn rules(&self) -> &[CopyRule] {
        &self.rules
    }
}

impl Transformer for ColumnCopy {
    type Fitted = FittedColumnCopy;

    fn fit(&self, schema: &Schema, _records: &[Record]) -> Result<Self::Fitted> {
        if self.pairs.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "ColumnCopy needs at least one (source, target) pair".to_string(),
            ));
        }

        // Later pairs may read the target of an earlier one.
        let mut current = schema.clone();
        let mut rules = Vec::with_capacity(self.pairs.len());
        for (source, target) in &self.pairs {
            let field = current.require(STAGE_NAME, source)?.clone();
            rules.push(CopyRule {
                source: source.clone(),
                target: target.clone(),
                label: field.is_label(),
            });
            current = current.with_field(Field {
                name: target.clone(),
                ..field
            });
        }

        Ok(FittedColumnCopy { rules })
    }
}

impl FittedTransformer for FittedColumnCopy {
    type Params = ColumnCopyParams;

    fn step_name(&self) -> &'static str {
        STAGE_NAME
    }

    fn output_schema(&self, input: &Schema) -> Result<Schema> {
        let mut schema = input.clone();
        for rule in &self.rules {
            match schema.field(&rule.source).cloned() {
                Some(field) => {
                    schema = schema.with_field(Field {
                        name: rule.target.clone(),
                        ..field
                    });
                }
                None if rule.label => {}
                None => return Err(PipelineError::missing_field(STAGE_NAME, &rule.source)),
            }
        }
        Ok(schema)
    }

    fn apply(&self, mut record: Record) -> Result<Record> {
        for rule in &self.rules {
            match record.get(&rule.source).cloned() {
                Some(value) => record.insert(rule.target.clone(), value),
                None if rule.label => {}
                None => return Err(PipelineError::missing_field(STAGE_NAME, &rule.source)),
            }
        }
        Ok(record)
    }

    fn extract_params(&self) -> Self::Params {
        ColumnCopyParams {
            rules: self.rules.clone(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self> {
        if params.rules.is_empty() {
            return Err(PipelineError::CorruptArtifact(
                "ColumnCopy has no copy rules".to_string(),
            ));
        }
        Ok(FittedColumnCopy {
            rules: params.rules,
        })
    }
}
