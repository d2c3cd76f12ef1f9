//! Pipeline chaining feature stages into a trainer.
//!
//! A [`Pipeline`] is an ordered list of unfitted stages plus a trainer.
//! [`Pipeline::fit`] fits every stage in turn on the training batch, threads
//! the schema through them, and trains the model on the resulting feature
//! vectors. The [`FittedPipeline`] it returns is immutable.
//!
//! # Example
//! ```ignore
//! use taxi_fares::model::FastTreeRegressor;
//! use taxi_fares::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new(FastTreeRegressor::default())
//!     .copy_columns([("fare_amount", "Label")])
//!     .one_hot(["vendor_id", "payment_type"])
//!     .concatenate("Features", ["vendor_id", "trip_distance", "payment_type"]);
//!
//! let fitted = pipeline.fit(&dataset)?;
//! let fare = fitted.predict(&trip.to_record())?;
//! ```

use crate::dataset::taxi::{
    FARE_AMOUNT, PASSENGER_COUNT, PAYMENT_TYPE, RATE_CODE, TRIP_DISTANCE, VENDOR_ID,
};
use crate::dataset::{Dataset, FieldType, Record, Schema};
use crate::error::{PipelineError, Result};
use crate::model::{FeatureVector, Model, Trainer};
use crate::preprocessing::{
    ColumnConcatenator, ColumnCopy, FittedStage, FittedTransformer, OneHotEncoder, Stage,
    StageKind, Transformer,
};
use crate::store::ModelStore;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_LABEL_COLUMN: &str = "Label";
pub const DEFAULT_FEATURES_COLUMN: &str = "Features";

const PIPELINE: &str = "Pipeline";

/// Unfitted pipeline: stage configuration plus trainer hyperparameters.
#[derive(Clone, Debug)]
pub struct Pipeline<T> {
    stages: Vec<Stage>,
    trainer: T,
    label_column: String,
    features_column: String,
}

impl<T: Trainer> Pipeline<T> {
    pub fn new(trainer: T) -> Self {
        Self {
            stages: Vec::new(),
            trainer,
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            features_column: DEFAULT_FEATURES_COLUMN.to_string(),
        }
    }

    /// The taxi-fare topology: copy the fare into the label, one-hot the
    /// vendor, rate code and payment type, then assemble the features.
    ///
    /// Trip time is loaded but not used as a feature.
    pub fn taxi_fares(trainer: T) -> Self {
        Self::new(trainer)
            .copy_columns([(FARE_AMOUNT, DEFAULT_LABEL_COLUMN)])
            .one_hot([VENDOR_ID, RATE_CODE, PAYMENT_TYPE])
            .concatenate(
                DEFAULT_FEATURES_COLUMN,
                [VENDOR_ID, RATE_CODE, PASSENGER_COUNT, TRIP_DISTANCE, PAYMENT_TYPE],
            )
    }

    /// Append any stage.
    pub fn add_stage(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    pub fn copy_columns<I, S, D>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        self.add_stage(ColumnCopy::new(pairs))
    }

    pub fn one_hot<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_stage(OneHotEncoder::new(columns))
    }

    pub fn concatenate<I, S>(self, output: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_stage(ColumnConcatenator::new(output, sources))
    }

    /// Field the trainer reads labels from (default `"Label"`).
    pub fn label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = name.into();
        self
    }

    /// Field the trainer reads feature vectors from (default `"Features"`).
    pub fn features_column(mut self, name: impl Into<String>) -> Self {
        self.features_column = name.into();
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    pub fn trainer(&self) -> &T {
        &self.trainer
    }

    /// Fit every stage and the trainer on `dataset`.
    ///
    /// # Errors
    /// - `EmptyDataset` if `dataset` has no records
    /// - `Schema` if a stage references a missing field, or the features or
    ///   label column is absent or of the wrong kind after the last stage
    /// - any error from a stage or the trainer
    pub fn fit(&self, dataset: &Dataset) -> Result<FittedPipeline<T::Model>> {
        if dataset.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "cannot fit pipeline on zero records".to_string(),
            ));
        }
        info!(
            records = dataset.len(),
            stages = self.stages.len(),
            "fitting pipeline"
        );

        let mut schema = dataset.schema().clone();
        let mut records = dataset.records().to_vec();
        let mut fitted = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let (stage, next_schema, next_records) = stage.fit_transform(&schema, records)?;
            debug!(
                stage = stage.step_name(),
                fields = next_schema.len(),
                "fitted stage"
            );
            fitted.push(stage);
            schema = next_schema;
            records = next_records;
        }

        check_features_field(&schema, &self.features_column)?;
        check_label_field(&schema, &self.label_column)?;

        let features = records
            .iter()
            .map(|r| r.vector(&self.features_column).map(<[f32]>::to_vec))
            .collect::<Result<Vec<FeatureVector>>>()?;
        let labels = records
            .iter()
            .map(|r| r.number(&self.label_column))
            .collect::<Result<Vec<f32>>>()?;

        let model = self.trainer.fit(&features, &labels)?;
        info!(
            model = <T::Model as Model>::KIND,
            n_features = model.n_features(),
            "trained model"
        );

        FittedPipeline::from_parts(
            dataset.schema().clone(),
            self.label_column.clone(),
            self.features_column.clone(),
            fitted,
            model,
        )
    }
}

fn check_features_field(schema: &Schema, name: &str) -> Result<usize> {
    let field = schema.require(PIPELINE, name)?;
    match field.ty {
        FieldType::Vector { len } if !field.is_label() => Ok(len),
        _ => Err(PipelineError::Schema(format!(
            "features column '{}' must be a feature vector, found {}",
            name, field.ty
        ))),
    }
}

fn check_label_field(schema: &Schema, name: &str) -> Result<()> {
    let field = schema.require(PIPELINE, name)?;
    if field.is_label() && field.ty == FieldType::Numeric {
        Ok(())
    } else {
        Err(PipelineError::Schema(format!(
            "label column '{}' must be a numeric field derived from the label",
            name
        )))
    }
}

/// The part of `input` a record must carry: fields read by a stage before any
/// earlier stage writes them, plus label-role fields. Input order is kept.
fn required_fields(input: &Schema, stages: &[FittedStage]) -> Schema {
    let mut written: HashSet<&str> = HashSet::new();
    let mut read: HashSet<&str> = HashSet::new();
    for stage in stages {
        read.extend(stage.reads().into_iter().filter(|name| !written.contains(name)));
        written.extend(stage.writes());
    }
    Schema::from_unique(
        input
            .fields()
            .iter()
            .filter(|f| f.is_label() || read.contains(f.name.as_str()))
            .cloned()
            .collect(),
    )
}

/// A trained pipeline, ready for prediction.
///
/// Immutable after construction; share it across threads freely.
#[derive(Clone, Debug)]
pub struct FittedPipeline<M> {
    input_schema: Schema,
    /// Input fields some stage reads, plus the label.
    required_schema: Schema,
    inference_schema: Schema,
    output_schema: Schema,
    label_column: String,
    features_column: String,
    stages: Vec<FittedStage>,
    model: M,
}

impl<M: Model> FittedPipeline<M> {
    /// Assemble a fitted pipeline, checking that the stages, the schema and
    /// the model agree with each other.
    pub fn from_parts(
        input_schema: Schema,
        label_column: String,
        features_column: String,
        stages: Vec<FittedStage>,
        model: M,
    ) -> Result<Self> {
        let thread = |start: Schema| {
            stages
                .iter()
                .try_fold(start, |schema, stage| stage.output_schema(&schema))
        };

        let output_schema = thread(input_schema.clone())?;
        let width = check_features_field(&output_schema, &features_column)?;
        check_label_field(&output_schema, &label_column)?;
        if width != model.n_features() {
            return Err(PipelineError::DimensionMismatch {
                expected: width,
                got: model.n_features(),
            });
        }

        let required_schema = required_fields(&input_schema, &stages);
        let required_output = thread(required_schema.clone())?;
        check_features_field(&required_output, &features_column)?;

        // The same stages must also work when the label is absent.
        let inference_schema = required_schema.without_labels();
        let inference_output = thread(inference_schema.clone())?;
        check_features_field(&inference_output, &features_column)?;

        Ok(Self {
            input_schema,
            required_schema,
            inference_schema,
            output_schema,
            label_column,
            features_column,
            stages,
            model,
        })
    }

    /// Run every stage on `record`.
    ///
    /// Only the input fields the stages read are required; other training
    /// columns may be absent. The raw label is optional and checked only when
    /// present.
    pub fn transform(&self, record: &Record) -> Result<Record> {
        let labelled = self
            .required_schema
            .labels()
            .any(|field| record.contains(&field.name));
        if labelled {
            self.required_schema.validate(record)?;
        } else {
            self.inference_schema.validate(record)?;
        }

        self.stages
            .iter()
            .try_fold(record.clone(), |record, stage| stage.apply(record))
    }

    pub fn transform_batch(&self, records: &[Record]) -> Result<Vec<Record>> {
        records.iter().map(|r| self.transform(r)).collect()
    }

    /// The feature vector the model sees for `record`.
    pub fn features(&self, record: &Record) -> Result<FeatureVector> {
        let transformed = self.transform(record)?;
        Ok(transformed.vector(&self.features_column)?.to_vec())
    }

    pub fn predict(&self, record: &Record) -> Result<f32> {
        let features = self.features(record)?;
        self.model.predict(&features)
    }

    /// Predict for many records in parallel. Output order matches input order.
    pub fn predict_batch(&self, records: &[Record]) -> Result<Vec<f32>> {
        records.par_iter().map(|r| self.predict(r)).collect()
    }

    pub fn stages(&self) -> &[FittedStage] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(FittedStage::step_name).collect()
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(FittedStage::kind).collect()
    }

    pub fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn features_column(&self) -> &str {
        &self.features_column
    }

    pub fn n_features(&self) -> usize {
        self.model.n_features()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Save to `path` atomically. See [`ModelStore::save`].
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        ModelStore::save(self, path)
    }

    /// Load a pipeline saved with [`save_to_file`](Self::save_to_file).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        ModelStore::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::taxi::TRIP_TIME_IN_SECS;
    use crate::dataset::{Field, TaxiTrip};
    use crate::model::{LinearRegressor, RegressionTreeTrainer};

    fn trip(vendor: &str, rate: &str, passengers: f32, distance: f32, payment: &str, fare: f32) -> TaxiTrip {
        TaxiTrip {
            vendor_id: vendor.to_string(),
            rate_code: rate.to_string(),
            passenger_count: passengers,
            trip_time_in_secs: 600.0,
            trip_distance: distance,
            payment_type: payment.to_string(),
            fare_amount: Some(fare),
        }
    }

    fn dataset() -> Dataset {
        let trips = [
            trip("CMT", "1", 1.0, 2.5, "CRD", 10.0),
            trip("VTS", "1", 2.0, 5.0, "CSH", 18.0),
            trip("VTS", "2", 1.0, 12.0, "CRD", 52.0),
            trip("CMT", "1", 3.0, 1.0, "CSH", 6.5),
        ];
        Dataset::new(TaxiTrip::schema(), trips.iter().map(TaxiTrip::to_record).collect()).unwrap()
    }

    fn fitted() -> FittedPipeline<crate::model::RegressionTree> {
        Pipeline::taxi_fares(RegressionTreeTrainer::new())
            .fit(&dataset())
            .unwrap()
    }

    #[test]
    fn test_taxi_pipeline_topology() {
        let pipeline = Pipeline::taxi_fares(LinearRegressor::new());
        assert_eq!(
            pipeline.stage_kinds(),
            vec![
                StageKind::ColumnCopy,
                StageKind::OneHotEncoder,
                StageKind::ColumnConcatenator
            ]
        );
    }

    #[test]
    fn test_fit_feature_width() {
        let fitted = fitted();
        // vendor 2 + rate 2 + passengers 1 + distance 1 + payment 2
        assert_eq!(fitted.n_features(), 8);
        assert_eq!(
            fitted.output_schema().field("Features").unwrap().ty,
            FieldType::Vector { len: 8 }
        );
        assert_eq!(
            fitted.stage_names(),
            vec!["ColumnCopy", "OneHotEncoder", "ColumnConcatenator"]
        );
    }

    #[test]
    fn test_features_follow_concatenation_order() {
        let record = trip("VTS", "2", 1.0, 12.0, "CRD", 52.0).to_record();
        let features = fitted().features(&record).unwrap();
        assert_eq!(features, vec![0.0, 1.0, 0.0, 1.0, 1.0, 12.0, 1.0, 0.0]);
    }

    #[test]
    fn test_predict_without_label() {
        let fitted = fitted();
        let mut record = trip("CMT", "1", 1.0, 2.5, "CRD", 10.0).to_record();
        let labelled = fitted.predict(&record).unwrap();

        record.remove(FARE_AMOUNT);
        let unlabelled = fitted.predict(&record).unwrap();
        assert_eq!(labelled, unlabelled);
        assert!(!fitted.transform(&record).unwrap().contains("Label"));
    }

    #[test]
    fn test_label_is_not_a_feature() {
        let fitted = fitted();
        let a = trip("CMT", "1", 1.0, 2.5, "CRD", 10.0).to_record();
        let b = trip("CMT", "1", 1.0, 2.5, "CRD", 999.0).to_record();
        assert_eq!(fitted.features(&a).unwrap(), fitted.features(&b).unwrap());
    }

    #[test]
    fn test_predict_batch_preserves_order() {
        let fitted = fitted();
        let records: Vec<Record> = dataset().records().to_vec();
        let batch = fitted.predict_batch(&records).unwrap();
        let single: Vec<f32> = records.iter().map(|r| fitted.predict(r).unwrap()).collect();
        assert_eq!(batch, single);
    }

    #[test]
    fn test_predict_missing_feature() {
        let mut record = TaxiTrip::sample().to_record();
        record.remove(TRIP_DISTANCE);
        assert!(matches!(fitted().predict(&record), Err(PipelineError::Schema(_))));
    }

    #[test]
    fn test_fit_empty_dataset() {
        let empty = Dataset::new(TaxiTrip::schema(), vec![]).unwrap();
        let result = Pipeline::taxi_fares(RegressionTreeTrainer::new()).fit(&empty);
        assert!(matches!(result, Err(PipelineError::EmptyDataset(_))));
    }

    #[test]
    fn test_fit_missing_features_column() {
        let result = Pipeline::new(RegressionTreeTrainer::new())
            .copy_columns([(FARE_AMOUNT, "Label")])
            .fit(&dataset());
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }

    #[test]
    fn test_fit_label_must_come_from_label() {
        let result = Pipeline::new(RegressionTreeTrainer::new())
            .copy_columns([(TRIP_DISTANCE, "Label")])
            .concatenate("Features", [PASSENGER_COUNT])
            .fit(&dataset());
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }

    #[test]
    fn test_custom_columns() {
        let schema = Schema::new(vec![Field::numeric("x"), Field::label("y")]).unwrap();
        let records = (0..4)
            .map(|i| Record::new().with("x", i as f32).with("y", 2.0 * i as f32))
            .collect();
        let dataset = Dataset::new(schema, records).unwrap();

        let fitted = Pipeline::new(RegressionTreeTrainer::new())
            .concatenate("vec", ["x"])
            .label_column("y")
            .features_column("vec")
            .fit(&dataset)
            .unwrap();
        assert_eq!(fitted.predict(&Record::new().with("x", 3.0f32)).unwrap(), 6.0);
    }

    #[test]
    fn test_predict_ignores_unread_columns() {
        let fitted = fitted();
        let full = trip("VTS", "2", 1.0, 12.0, "CRD", 52.0).to_record();
        let mut record = full.clone();
        record.remove(TRIP_TIME_IN_SECS);
        assert_eq!(fitted.predict(&record).unwrap(), fitted.predict(&full).unwrap());

        record.remove(FARE_AMOUNT);
        assert_eq!(fitted.predict(&record).unwrap(), fitted.predict(&full).unwrap());
    }

    #[test]
    fn test_predict_rejects_nan_feature() {
        let record = trip("CMT", "1", 1.0, f32::NAN, "CRD", 10.0).to_record();
        assert!(matches!(
            fitted().predict(&record),
            Err(PipelineError::Type { .. })
        ));
    }
}
