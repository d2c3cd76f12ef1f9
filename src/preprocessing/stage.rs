//! Tagged stage variants used by the pipeline and the model store.
//!
//! The pipeline holds a heterogeneous stage list, so every concrete stage is
//! wrapped in [`Stage`] (unfitted) or [`FittedStage`] (fitted). Both enums
//! implement the stage traits by dispatching to the wrapped variant.

use crate::dataset::{Record, Schema};
use crate::error::Result;
use crate::preprocessing::concat::{
    ColumnConcatenator, ColumnConcatenatorParams, FittedColumnConcatenator,
};
use crate::preprocessing::copy::{ColumnCopy, ColumnCopyParams, FittedColumnCopy};
use crate::preprocessing::encoding::{FittedOneHotEncoder, OneHotEncoder, OneHotEncoderParams};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage variant tag, used to check an artifact's stage sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    ColumnCopy,
    OneHotEncoder,
    ColumnConcatenator,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::ColumnCopy => "ColumnCopy",
            StageKind::OneHotEncoder => "OneHotEncoder",
            StageKind::ColumnConcatenator => "ColumnConcatenator",
        };
        f.write_str(name)
    }
}

/// A stage in the unfitted pipeline.
#[derive(Clone, Debug)]
pub enum Stage {
    ColumnCopy(ColumnCopy),
    OneHotEncoder(OneHotEncoder),
    ColumnConcatenator(ColumnConcatenator),
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::ColumnCopy(_) => StageKind::ColumnCopy,
            Stage::OneHotEncoder(_) => StageKind::OneHotEncoder,
            Stage::ColumnConcatenator(_) => StageKind::ColumnConcatenator,
        }
    }
}

impl From<ColumnCopy> for Stage {
    fn from(stage: ColumnCopy) -> Self {
        Stage::ColumnCopy(stage)
    }
}

impl From<OneHotEncoder> for Stage {
    fn from(stage: OneHotEncoder) -> Self {
        Stage::OneHotEncoder(stage)
    }
}

impl From<ColumnConcatenator> for Stage {
    fn from(stage: ColumnConcatenator) -> Self {
        Stage::ColumnConcatenator(stage)
    }
}

impl Transformer for Stage {
    type Fitted = FittedStage;

    fn fit(&self, schema: &Schema, records: &[Record]) -> Result<Self::Fitted> {
        match self {
            Stage::ColumnCopy(t) => t.fit(schema, records).map(FittedStage::ColumnCopy),
            Stage::OneHotEncoder(t) => t.fit(schema, records).map(FittedStage::OneHotEncoder),
            Stage::ColumnConcatenator(t) => {
                t.fit(schema, records).map(FittedStage::ColumnConcatenator)
            }
        }
    }
}

/// A fitted stage.
#[derive(Clone, Debug)]
pub enum FittedStage {
    ColumnCopy(FittedColumnCopy),
    OneHotEncoder(FittedOneHotEncoder),
    ColumnConcatenator(FittedColumnConcatenator),
}

impl FittedStage {
    pub fn kind(&self) -> StageKind {
        match self {
            FittedStage::ColumnCopy(_) => StageKind::ColumnCopy,
            FittedStage::OneHotEncoder(_) => StageKind::OneHotEncoder,
            FittedStage::ColumnConcatenator(_) => StageKind::ColumnConcatenator,
        }
    }

    /// Fields this stage reads from its input record.
    pub fn reads(&self) -> Vec<&str> {
        match self {
            FittedStage::ColumnCopy(t) => t.rules().iter().map(|r| r.source.as_str()).collect(),
            FittedStage::OneHotEncoder(t) => t.columns().iter().map(String::as_str).collect(),
            FittedStage::ColumnConcatenator(t) => {
                t.sources().iter().map(|s| s.name.as_str()).collect()
            }
        }
    }

    /// New fields this stage adds to the record. In-place rewrites are not listed.
    pub fn writes(&self) -> Vec<&str> {
        match self {
            FittedStage::ColumnCopy(t) => t.rules().iter().map(|r| r.target.as_str()).collect(),
            FittedStage::OneHotEncoder(_) => Vec::new(),
            FittedStage::ColumnConcatenator(t) => vec![t.output()],
        }
    }
}

/// Serializable parameters of any fitted stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StageParams {
    ColumnCopy(ColumnCopyParams),
    OneHotEncoder(OneHotEncoderParams),
    ColumnConcatenator(ColumnConcatenatorParams),
}

impl StageParams {
    pub fn kind(&self) -> StageKind {
        match self {
            StageParams::ColumnCopy(_) => StageKind::ColumnCopy,
            StageParams::OneHotEncoder(_) => StageKind::OneHotEncoder,
            StageParams::ColumnConcatenator(_) => StageKind::ColumnConcatenator,
        }
    }
}

impl FittedTransformer for FittedStage {
    type Params = StageParams;

    fn step_name(&self) -> &'static str {
        match self {
            FittedStage::ColumnCopy(t) => t.step_name(),
            FittedStage::OneHotEncoder(t) => t.step_name(),
            FittedStage::ColumnConcatenator(t) => t.step_name(),
        }
    }

    fn output_schema(&self, input: &Schema) -> Result<Schema> {
        match self {
            FittedStage::ColumnCopy(t) => t.output_schema(input),
            FittedStage::OneHotEncoder(t) => t.output_schema(input),
            FittedStage::ColumnConcatenator(t) => t.output_schema(input),
        }
    }

    fn apply(&self, record: Record) -> Result<Record> {
        match self {
            FittedStage::ColumnCopy(t) => t.apply(record),
            FittedStage::OneHotEncoder(t) => t.apply(record),
            FittedStage::ColumnConcatenator(t) => t.apply(record),
        }
    }

    fn extract_params(&self) -> Self::Params {
        match self {
            FittedStage::ColumnCopy(t) => StageParams::ColumnCopy(t.extract_params()),
            FittedStage::OneHotEncoder(t) => StageParams::OneHotEncoder(t.extract_params()),
            FittedStage::ColumnConcatenator(t) => {
                StageParams::ColumnConcatenator(t.extract_params())
            }
        }
    }

    fn from_params(params: Self::Params) -> Result<Self> {
        match params {
            StageParams::ColumnCopy(p) => {
                FittedColumnCopy::from_params(p).map(FittedStage::ColumnCopy)
            }
            StageParams::OneHotEncoder(p) => {
                FittedOneHotEncoder::from_params(p).map(FittedStage::OneHotEncoder)
            }
            StageParams::ColumnConcatenator(p) => {
                FittedColumnConcatenator::from_params(p).map(FittedStage::ColumnConcatenator)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Field;

    #[test]
    fn test_stage_dispatch() {
        let schema =
            Schema::new(vec![Field::categorical("vendor_id"), Field::label("fare_amount")])
                .unwrap();
        let records = vec![Record::new()
            .with("vendor_id", "CMT")
            .with("fare_amount", 4.5f32)];

        let stage: Stage = OneHotEncoder::new(["vendor_id"]).into();
        assert_eq!(stage.kind(), StageKind::OneHotEncoder);

        let fitted = stage.fit(&schema, &records).unwrap();
        assert_eq!(fitted.kind(), StageKind::OneHotEncoder);
        assert_eq!(fitted.step_name(), "OneHotEncoder");

        let params = fitted.extract_params();
        assert_eq!(params.kind(), StageKind::OneHotEncoder);

        let restored = FittedStage::from_params(params).unwrap();
        let out = restored.apply(records[0].clone()).unwrap();
        assert_eq!(out.vector("vendor_id").unwrap(), &[1.0]);
    }

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::ColumnConcatenator.to_string(), "ColumnConcatenator");
    }

    #[test]
    fn test_stage_reads_and_writes() {
        let schema = Schema::new(vec![
            Field::numeric("trip_distance"),
            Field::label("fare_amount"),
        ])
        .unwrap();
        let records = vec![Record::new()
            .with("trip_distance", 2.5f32)
            .with("fare_amount", 10.0f32)];

        let copy = Stage::from(ColumnCopy::new([("fare_amount", "Label")]))
            .fit(&schema, &records)
            .unwrap();
        assert_eq!(copy.reads(), vec!["fare_amount"]);
        assert_eq!(copy.writes(), vec!["Label"]);

        let concat = Stage::from(ColumnConcatenator::new("Features", ["trip_distance"]))
            .fit(&schema, &records)
            .unwrap();
        assert_eq!(concat.reads(), vec!["trip_distance"]);
        assert_eq!(concat.writes(), vec!["Features"]);
    }
}
