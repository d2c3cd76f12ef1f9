//! Persistence of fitted pipelines.
//!
//! An artifact is one bincode document holding a header, the input schema,
//! the parameters of every fitted stage and the encoded model. Loading
//! rebuilds each stage from its parameters and re-checks that the stages,
//! the schema and the model fit together; any inconsistency is reported as
//! `CorruptArtifact` rather than surfacing later at prediction time.

use crate::dataset::Schema;
use crate::error::{PipelineError, Result};
use crate::model::Model;
use crate::pipeline::FittedPipeline;
use crate::preprocessing::{FittedStage, FittedTransformer, StageKind, StageParams};
use crate::serialization::SerializableParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

const MAGIC: [u8; 8] = *b"TAXIFARE";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Artifact {
    magic: [u8; 8],
    format_version: u32,
    model_kind: String,
    input_schema: Schema,
    label_column: String,
    features_column: String,
    stages: Vec<StageParams>,
    model: Vec<u8>,
}

fn corrupt(err: PipelineError) -> PipelineError {
    match err {
        PipelineError::CorruptArtifact(_) => err,
        other => PipelineError::CorruptArtifact(other.to_string()),
    }
}

/// Saves and loads [`FittedPipeline`]s.
pub struct ModelStore;

impl ModelStore {
    /// Encode a fitted pipeline.
    pub fn to_bytes<M: Model>(pipeline: &FittedPipeline<M>) -> Result<Vec<u8>> {
        let artifact = Artifact {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            model_kind: M::KIND.to_string(),
            input_schema: pipeline.input_schema().clone(),
            label_column: pipeline.label_column().to_string(),
            features_column: pipeline.features_column().to_string(),
            stages: pipeline
                .stages()
                .iter()
                .map(FittedStage::extract_params)
                .collect(),
            model: pipeline.model().to_bytes()?,
        };
        Ok(artifact.to_bytes()?)
    }

    /// Decode and validate a fitted pipeline.
    ///
    /// # Errors
    /// `CorruptArtifact` for undecodable bytes, a foreign header or version,
    /// a different model kind, or stages and model that disagree.
    pub fn from_bytes<M: Model>(bytes: &[u8]) -> Result<FittedPipeline<M>> {
        let artifact = Artifact::from_bytes(bytes)
            .map_err(|e| PipelineError::CorruptArtifact(format!("undecodable artifact: {}", e)))?;

        if artifact.magic != MAGIC {
            return Err(PipelineError::CorruptArtifact(
                "not a taxi-fare model artifact".to_string(),
            ));
        }
        if artifact.format_version != FORMAT_VERSION {
            return Err(PipelineError::CorruptArtifact(format!(
                "unsupported format version {} (expected {})",
                artifact.format_version, FORMAT_VERSION
            )));
        }
        if artifact.model_kind != M::KIND {
            return Err(PipelineError::CorruptArtifact(format!(
                "artifact holds a '{}' model, expected '{}'",
                artifact.model_kind,
                M::KIND
            )));
        }
        if artifact.stages.is_empty() {
            return Err(PipelineError::CorruptArtifact(
                "artifact has no stages".to_string(),
            ));
        }

        let stages = artifact
            .stages
            .into_iter()
            .map(FittedStage::from_params)
            .collect::<Result<Vec<_>>>()
            .map_err(corrupt)?;

        let model = M::from_bytes(&artifact.model)
            .map_err(|e| PipelineError::CorruptArtifact(format!("undecodable model: {}", e)))?;
        model.validate().map_err(corrupt)?;

        FittedPipeline::from_parts(
            artifact.input_schema,
            artifact.label_column,
            artifact.features_column,
            stages,
            model,
        )
        .map_err(corrupt)
    }

    /// Write `pipeline` to `path` atomically.
    ///
    /// The artifact is written to a temporary file in the destination
    /// directory, synced, then renamed over `path`. On failure the temporary
    /// file is removed and any existing file at `path` is untouched.
    pub fn save<M: Model, P: AsRef<Path>>(pipeline: &FittedPipeline<M>, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = Self::to_bytes(pipeline)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        info!(path = %path.display(), bytes = bytes.len(), "saved model");
        Ok(())
    }

    /// Load a pipeline saved with [`save`](Self::save).
    pub fn load<M: Model, P: AsRef<Path>>(path: P) -> Result<FittedPipeline<M>> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let pipeline = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            stages = pipeline.stages().len(),
            n_features = pipeline.n_features(),
            "loaded model"
        );
        Ok(pipeline)
    }

    /// Load a pipeline and require its stage sequence to be `expected`.
    pub fn load_expecting<M: Model, P: AsRef<Path>>(
        path: P,
        expected: &[StageKind],
    ) -> Result<FittedPipeline<M>> {
        let pipeline = Self::load(path)?;
        let found = pipeline.stage_kinds();
        if found != expected {
            return Err(PipelineError::CorruptArtifact(format!(
                "stage sequence {:?} differs from expected {:?}",
                found, expected
            )));
        }
        Ok(pipeline)
    }
}
