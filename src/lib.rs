//! # taxi-fares
//!
//! Taxi fare regression with a typed fit/apply pipeline and strict separation
//! between training and inference.
//!
//! ## Core Design Principles
//!
//! - **Two-state stages**: every stage is configured unfitted, learns its state
//!   once from the training batch, and is immutable afterwards.
//! - **Schema threading**: each stage maps its input schema to an output
//!   schema, so a missing or mistyped field is reported before any prediction.
//! - **Training/Inference Separation**: trained models contain only prediction
//!   parameters; hyperparameters live in the trainers.
//! - **Label on the training path only**: inference records may omit the fare.
//!
//! ## Quick Start
//!
//! ```rust
//! use taxi_fares::dataset::{Dataset, TaxiTrip};
//! use taxi_fares::model::RegressionTreeTrainer;
//! use taxi_fares::pipeline::Pipeline;
//!
//! let csv = "\
//! vendor_id,rate_code,passenger_count,trip_time_in_secs,trip_distance,payment_type,fare_amount
//! CMT,1,1,600,2.5,CRD,10.0
//! VTS,1,2,900,5.0,CSH,18.0
//! ";
//! let trips = TaxiTrip::read_from(csv.as_bytes()).unwrap();
//! let records = trips.iter().map(TaxiTrip::to_record).collect();
//! let train = Dataset::new(TaxiTrip::schema(), records).unwrap();
//!
//! let fitted = Pipeline::taxi_fares(RegressionTreeTrainer::new()).fit(&train).unwrap();
//! let fare = fitted.predict(&TaxiTrip::sample().to_record()).unwrap();
//! assert!(fare.is_finite());
//! ```
//!
//! ## Module Structure
//!
//! - `dataset`: records, schemas and the taxi trip loader
//! - `preprocessing`: column copy, one-hot encoding, column concatenation
//! - `model`: trainers and fitted regressors (boosted trees, CART, linear)
//! - `pipeline`: stage chaining, fitting and prediction
//! - `evaluation`: MAE, MSE, RMSE and R²
//! - `store`: atomic save and validated load of fitted pipelines
//! - `engine`: train/save/load/evaluate/predict behind one handle
//! - `config`: file paths and trainer selection

/// Records, schemas and dataset loading.
pub mod dataset;

/// Feature transform stages.
pub mod preprocessing;

/// Trainers and fitted regression models.
pub mod model;

pub mod pipeline;

pub mod evaluation;

/// Model persistence.
pub mod store;

/// Serialization of fitted parameters.
pub mod serialization;

pub mod engine;

pub mod config;

pub mod error;

pub use config::{AppConfig, TrainerConfig};
pub use dataset::{Dataset, Record, Schema, TaxiTrip};
pub use engine::PredictionEngine;
pub use error::{PipelineError, Result};
pub use evaluation::{RSquared, RegressionEvaluator, RegressionMetrics};
pub use model::{FastTreeRegressor, Model, Trainer};
pub use pipeline::{FittedPipeline, Pipeline};
pub use store::ModelStore;
