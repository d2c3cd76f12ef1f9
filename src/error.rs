//! Error types for pipeline operations.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error type shared by stages, trainers, the evaluator and the model store.
///
/// Every failure surfaces to the immediate caller; batch operations stop at the
/// first failing record.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage referenced a field that is absent from the incoming schema or record.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A field value does not have the type the stage expects.
    #[error("Type error: field '{field}' expected {expected}, got {got}")]
    Type {
        field: String,
        expected: String,
        got: String,
    },

    /// Zero records where at least one is required.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Fitted state was requested before fit or load.
    #[error("Not fitted: {0}")]
    NotFitted(String),

    /// Feature vector length differs between fit time and apply time, or between rows.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Artifact is inconsistent with the expected stage sequence or parameter shapes.
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// Invalid hyperparameter or stage configuration.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unreadable or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub(crate) fn missing_field(stage: &str, field: &str) -> Self {
        PipelineError::Schema(format!("{} references missing field '{}'", stage, field))
    }

    pub(crate) fn wrong_type(field: &str, expected: impl ToString, got: impl ToString) -> Self {
        PipelineError::Type {
            field: field.to_string(),
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_schema() {
        let err = PipelineError::missing_field("ColumnCopy", "fare_amount");
        let msg = err.to_string();
        assert!(msg.contains("Schema error"));
        assert!(msg.contains("fare_amount"));
    }

    #[test]
    fn test_error_display_type() {
        let err = PipelineError::wrong_type("vendor_id", "categorical", "numeric");
        assert_eq!(
            err.to_string(),
            "Type error: field 'vendor_id' expected categorical, got numeric"
        );
    }

    #[test]
    fn test_error_display_dimension_mismatch() {
        let err = PipelineError::DimensionMismatch {
            expected: 7,
            got: 5,
        };
        assert!(err.to_string().contains("expected 7, got 5"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_error_from_bincode_error() {
        let bad_bytes: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        let e = bincode::deserialize::<String>(bad_bytes).unwrap_err();
        let err: PipelineError = e.into();
        assert!(matches!(err, PipelineError::Serialization(_)));
    }

    #[test]
    fn test_error_is_std_error() {
        let err = PipelineError::NotFitted("predict".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
