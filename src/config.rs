//! Application configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! reproduces the stock layout under the data directory:
//!
//! ```text
//! <data_dir>/Data/taxi-fare-train.csv
//! <data_dir>/Data/taxi-fare-test.csv
//! <data_dir>/Data/model.zip
//! ```

use crate::error::{PipelineError, Result};
use crate::model::{FastTreeRegressor, LinearRegressor, RegressionTreeTrainer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which trainer to use, with its hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainerConfig {
    FastTree(FastTreeRegressor),
    RegressionTree(RegressionTreeTrainer),
    Linear(LinearRegressor),
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig::FastTree(FastTreeRegressor::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base directory the relative paths below are resolved against.
    pub data_dir: PathBuf,
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub model_file: PathBuf,
    pub trainer: TrainerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            train_file: PathBuf::from("Data/taxi-fare-train.csv"),
            test_file: PathBuf::from("Data/taxi-fare-test.csv"),
            model_file: PathBuf::from("Data/model.zip"),
            trainer: TrainerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| PipelineError::Config(format!("invalid configuration: {}", e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn train_path(&self) -> PathBuf {
        self.resolve(&self.train_file)
    }

    pub fn test_path(&self) -> PathBuf {
        self.resolve(&self.test_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.resolve(&self.model_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = AppConfig::default().with_data_dir("/srv/taxi");
        assert_eq!(
            config.train_path(),
            PathBuf::from("/srv/taxi/Data/taxi-fare-train.csv")
        );
        assert_eq!(config.model_path(), PathBuf::from("/srv/taxi/Data/model.zip"));
        assert_eq!(config.trainer, TrainerConfig::FastTree(FastTreeRegressor::default()));
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(AppConfig::from_json("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_trainer_config() {
        let config = AppConfig::from_json(
            r#"{"model_file": "out/fares.bin", "trainer": {"kind": "fast_tree", "n_trees": 20}}"#,
        )
        .unwrap();
        assert_eq!(config.model_file, PathBuf::from("out/fares.bin"));
        match config.trainer {
            TrainerConfig::FastTree(t) => {
                assert_eq!(t.n_trees, 20);
                assert_eq!(t.learning_rate, 0.2);
            }
            other => panic!("unexpected trainer {:?}", other),
        }
    }

    #[test]
    fn test_linear_trainer_config() {
        let config =
            AppConfig::from_json(r#"{"trainer": {"kind": "linear", "max_epochs": 10}}"#).unwrap();
        assert_eq!(
            config.trainer,
            TrainerConfig::Linear(LinearRegressor::new().max_epochs(10))
        );
    }

    #[test]
    fn test_invalid_json() {
        let result = AppConfig::from_json(r#"{"trainer": {"kind": "svm"}}"#);
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"data_dir": "/data"}"#).unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.test_path(), PathBuf::from("/data/Data/taxi-fare-test.csv"));

        let missing = AppConfig::from_file(dir.path().join("none.json"));
        assert!(matches!(missing, Err(PipelineError::Config(_))));
    }
}
