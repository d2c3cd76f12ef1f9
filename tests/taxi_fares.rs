use std::sync::Arc;
use std::thread;

use taxi_fares::dataset::{Dataset, Field, Record, Schema, TaxiTrip};
use taxi_fares::evaluation::{RSquared, RegressionEvaluator};
use taxi_fares::model::{
    BoostedTreesModel, FastTreeRegressor, Model, RegressionTree, RegressionTreeTrainer,
};
use taxi_fares::pipeline::Pipeline;
use taxi_fares::preprocessing::StageKind;
use taxi_fares::store::ModelStore;
use taxi_fares::{FittedPipeline, PipelineError, PredictionEngine};

fn trip(vendor: &str, rate: &str, passengers: f32, distance: f32, payment: &str) -> TaxiTrip {
    TaxiTrip {
        vendor_id: vendor.to_string(),
        rate_code: rate.to_string(),
        passenger_count: passengers,
        trip_time_in_secs: 0.0,
        trip_distance: distance,
        payment_type: payment.to_string(),
        fare_amount: None,
    }
}

fn labelled(trip: TaxiTrip, fare: f32) -> TaxiTrip {
    TaxiTrip {
        fare_amount: Some(fare),
        ..trip
    }
}

fn dataset(trips: &[TaxiTrip]) -> Dataset {
    Dataset::new(TaxiTrip::schema(), trips.iter().map(TaxiTrip::to_record).collect()).unwrap()
}

fn two_trips() -> Dataset {
    dataset(&[
        labelled(trip("CMT", "1", 1.0, 2.5, "CRD"), 10.0),
        labelled(trip("VTS", "1", 2.0, 5.0, "CSH"), 18.0),
    ])
}

/// A few dozen trips where the fare depends on distance, rate and vendor.
fn city_trips() -> Dataset {
    let vendors = ["CMT", "VTS"];
    let rates = ["1", "2", "5"];
    let payments = ["CRD", "CSH"];
    let trips: Vec<TaxiTrip> = (0..48)
        .map(|i| {
            let vendor = vendors[i % 2];
            let rate = rates[i % 3];
            let distance = 0.5 + (i as f32) * 0.75;
            let fare = 2.5
                + 2.0 * distance
                + if rate == "2" { 20.0 } else { 0.0 }
                + if vendor == "VTS" { 1.0 } else { 0.0 };
            labelled(
                trip(vendor, rate, 1.0 + (i % 4) as f32, distance, payments[(i / 2) % 2]),
                fare,
            )
        })
        .collect();
    dataset(&trips)
}

/// A trip record holding only the fields the pipeline consumes.
fn trip_record(vendor: &str, rate: &str, passengers: f32, distance: f32, payment: &str) -> Record {
    Record::new()
        .with("vendor_id", vendor)
        .with("rate_code", rate)
        .with("passenger_count", passengers)
        .with("trip_distance", distance)
        .with("payment_type", payment)
}

#[test]
fn end_to_end_two_trips() {
    let schema = Schema::new(vec![
        Field::categorical("vendor_id"),
        Field::categorical("rate_code"),
        Field::numeric("passenger_count"),
        Field::numeric("trip_distance"),
        Field::categorical("payment_type"),
        Field::label("fare_amount"),
    ])
    .unwrap();
    let train = Dataset::new(
        schema,
        vec![
            trip_record("CMT", "1", 1.0, 2.5, "CRD").with("fare_amount", 10.0f32),
            trip_record("VTS", "1", 2.0, 5.0, "CSH").with("fare_amount", 18.0f32),
        ],
    )
    .unwrap();
    let fitted = Pipeline::taxi_fares(FastTreeRegressor::default())
        .fit(&train)
        .unwrap();

    // vendor 2 + rate 1 + passengers 1 + distance 1 + payment 2
    assert_eq!(fitted.n_features(), 7);

    let record = trip_record("CMT", "1", 1.0, 2.5, "CRD");
    let features = fitted.features(&record).unwrap();
    assert_eq!(features, vec![1.0, 0.0, 1.0, 1.0, 2.5, 1.0, 0.0]);

    let prediction = fitted.predict(&record).unwrap();
    assert!(prediction.is_finite());
}

#[test]
fn prediction_does_not_need_unused_trip_time() {
    // Trained on full trips, including trip_time_in_secs.
    let fitted = Pipeline::taxi_fares(RegressionTreeTrainer::new())
        .fit(&city_trips())
        .unwrap();

    let bare = trip_record("VTS", "2", 2.0, 7.0, "CSH");
    let full = trip("VTS", "2", 2.0, 7.0, "CSH").to_record();
    assert_eq!(fitted.predict(&bare).unwrap(), fitted.predict(&full).unwrap());
    assert_eq!(
        fitted.predict_batch(&[bare.clone(), full]).unwrap(),
        vec![fitted.predict(&bare).unwrap(); 2]
    );
}

#[test]
fn nan_values_are_rejected_before_training() {
    let csv = "\
vendor_id,rate_code,passenger_count,trip_time_in_secs,trip_distance,payment_type,fare_amount
CMT,1,1,1271,3.8,CRD,17.5
VTS,1,2,474,NaN,CSH,8
CMT,2,1,900,9.1,CSH,52
";
    let trips = TaxiTrip::read_from(csv.as_bytes()).unwrap();
    assert!(trips[1].trip_distance.is_nan());

    let result = Dataset::new(
        TaxiTrip::schema(),
        trips.iter().map(TaxiTrip::to_record).collect(),
    );
    assert!(matches!(result, Err(PipelineError::Type { .. })));

    // Every pipeline that can be fitted round-trips through the store.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.zip");
    let clean: Vec<TaxiTrip> = trips.into_iter().filter(|t| t.trip_distance.is_finite()).collect();
    let fitted = Pipeline::taxi_fares(RegressionTreeTrainer::new())
        .fit(&dataset(&clean))
        .unwrap();
    fitted.save_to_file(&path).unwrap();
    let loaded = FittedPipeline::<RegressionTree>::load_from_file(&path).unwrap();
    let record = TaxiTrip::sample().to_record();
    assert_eq!(
        fitted.predict(&record).unwrap().to_bits(),
        loaded.predict(&record).unwrap().to_bits()
    );
}

#[test]
fn save_load_round_trip_is_bit_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.zip");

    let train = city_trips();
    let fitted = Pipeline::taxi_fares(FastTreeRegressor::default().with_min_samples_leaf(2))
        .fit(&train)
        .unwrap();
    fitted.save_to_file(&path).unwrap();
    let loaded = FittedPipeline::<BoostedTreesModel>::load_from_file(&path).unwrap();

    let mut records: Vec<Record> = train.records().to_vec();
    records.push(TaxiTrip::sample().to_record());
    records.push(trip("DDS", "99", 4.0, 3.0, "NOC").to_record());

    let before = fitted.predict_batch(&records).unwrap();
    let after = loaded.predict_batch(&records).unwrap();
    let bits = |v: &[f32]| v.iter().map(|p| p.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&before), bits(&after));
}

#[test]
fn label_does_not_influence_features() {
    let fitted = Pipeline::taxi_fares(RegressionTreeTrainer::new())
        .fit(&city_trips())
        .unwrap();
    let base = trip("VTS", "2", 2.0, 7.0, "CSH");

    let without = fitted.features(&base.to_record()).unwrap();
    let low = fitted.features(&labelled(base.clone(), 1.0).to_record()).unwrap();
    let high = fitted.features(&labelled(base, 1000.0).to_record()).unwrap();
    assert_eq!(without, low);
    assert_eq!(without, high);
}

#[test]
fn unseen_categories_encode_to_zero_and_vocabulary_stays_frozen() {
    let fitted = Pipeline::taxi_fares(RegressionTreeTrainer::new())
        .fit(&two_trips())
        .unwrap();
    let width = fitted.n_features();

    let unseen = trip("DDS", "7", 1.0, 2.5, "UNK").to_record();
    let features = fitted.features(&unseen).unwrap();
    assert_eq!(features.len(), width);
    // vendor slots, rate slot and payment slots are all zero.
    assert_eq!(features, vec![0.0, 0.0, 0.0, 1.0, 2.5, 0.0, 0.0]);

    let known = trip("VTS", "1", 2.0, 5.0, "CSH").to_record();
    assert_eq!(
        fitted.features(&known).unwrap(),
        vec![0.0, 1.0, 1.0, 2.0, 5.0, 0.0, 1.0]
    );
    assert_eq!(fitted.n_features(), width);
}

#[test]
fn r_squared_is_one_on_memorised_training_data() {
    let train = city_trips();
    let fitted = Pipeline::taxi_fares(RegressionTreeTrainer::new().with_max_depth(64))
        .fit(&train)
        .unwrap();
    let metrics = RegressionEvaluator::new().evaluate(&fitted, &train).unwrap();
    assert_eq!(metrics.r_squared, RSquared::Defined(1.0));
    assert_eq!(metrics.mae, 0.0);
}

#[test]
fn r_squared_undefined_for_constant_labels() {
    let train = dataset(&[
        labelled(trip("CMT", "1", 1.0, 2.5, "CRD"), 7.0),
        labelled(trip("VTS", "1", 2.0, 5.0, "CSH"), 7.0),
        labelled(trip("VTS", "2", 1.0, 9.0, "CSH"), 7.0),
    ]);
    let fitted = Pipeline::taxi_fares(FastTreeRegressor::default())
        .fit(&train)
        .unwrap();
    let metrics = RegressionEvaluator::new().evaluate(&fitted, &train).unwrap();
    assert_eq!(metrics.r_squared, RSquared::Undefined);
}

#[test]
fn evaluation_requires_labels() {
    let fitted = Pipeline::taxi_fares(FastTreeRegressor::default())
        .fit(&two_trips())
        .unwrap();
    let records = vec![TaxiTrip::sample().to_record()];
    let result = RegressionEvaluator::new().evaluate_records(&fitted, &records);
    assert!(matches!(result, Err(PipelineError::Schema(_))));
}

#[test]
fn fitting_is_deterministic() {
    let train = city_trips();
    let pipeline = Pipeline::taxi_fares(
        FastTreeRegressor::default()
            .with_subsample(0.7)
            .with_min_samples_leaf(2),
    );
    let a = pipeline.fit(&train).unwrap();
    let b = pipeline.fit(&train).unwrap();
    assert_eq!(a.model(), b.model());
    assert_eq!(
        ModelStore::to_bytes(&a).unwrap(),
        ModelStore::to_bytes(&b).unwrap()
    );
}

#[test]
fn concurrent_prediction_matches_sequential() {
    let train = city_trips();
    let fitted = Arc::new(
        Pipeline::taxi_fares(FastTreeRegressor::default().with_min_samples_leaf(2))
            .fit(&train)
            .unwrap(),
    );
    let records: Arc<Vec<Record>> = Arc::new(train.records().to_vec());
    let expected: Vec<f32> = records
        .iter()
        .map(|r| fitted.predict(r).unwrap())
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fitted = Arc::clone(&fitted);
            let records = Arc::clone(&records);
            thread::spawn(move || {
                records
                    .iter()
                    .map(|r| fitted.predict(r).unwrap())
                    .collect::<Vec<f32>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn engine_requires_training_or_loading() {
    let engine = PredictionEngine::new(Pipeline::taxi_fares(FastTreeRegressor::default()));
    let result = engine.predict(&TaxiTrip::sample().to_record());
    assert!(matches!(result, Err(PipelineError::NotFitted(_))));
}

#[test]
fn boosted_model_learns_distance() {
    let train = city_trips();
    let fitted = Pipeline::taxi_fares(FastTreeRegressor::default().with_min_samples_leaf(2))
        .fit(&train)
        .unwrap();
    let metrics = RegressionEvaluator::new().evaluate(&fitted, &train).unwrap();
    match metrics.r_squared {
        RSquared::Defined(r2) => assert!(r2 > 0.9, "r2 = {}", r2),
        RSquared::Undefined => panic!("labels vary"),
    }
    assert_eq!(
        fitted.stage_kinds(),
        vec![
            StageKind::ColumnCopy,
            StageKind::OneHotEncoder,
            StageKind::ColumnConcatenator
        ]
    );
    assert_eq!(fitted.model().n_features(), fitted.n_features());
}
