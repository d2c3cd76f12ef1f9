//! Taxi trip records and their delimited-file loader.
//!
//! The input files carry a header row:
//! `vendor_id,rate_code,passenger_count,trip_time_in_secs,trip_distance,payment_type,fare_amount`.
//! Columns are matched by header name, unknown columns are ignored and
//! `fare_amount` may be empty or absent in inference files.

use crate::dataset::{Dataset, Field, Record, Schema};
use crate::error::Result;
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

pub const VENDOR_ID: &str = "vendor_id";
pub const RATE_CODE: &str = "rate_code";
pub const PASSENGER_COUNT: &str = "passenger_count";
pub const TRIP_TIME_IN_SECS: &str = "trip_time_in_secs";
pub const TRIP_DISTANCE: &str = "trip_distance";
pub const PAYMENT_TYPE: &str = "payment_type";
pub const FARE_AMOUNT: &str = "fare_amount";

/// One taxi trip as it appears in the input files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxiTrip {
    pub vendor_id: String,
    pub rate_code: String,
    pub passenger_count: f32,
    #[serde(default)]
    pub trip_time_in_secs: f32,
    pub trip_distance: f32,
    pub payment_type: String,
    #[serde(default)]
    pub fare_amount: Option<f32>,
}

impl TaxiTrip {
    /// Schema of a labelled trip; `fare_amount` is the label.
    pub fn schema() -> Schema {
        Schema::from_unique(vec![
            Field::categorical(VENDOR_ID),
            Field::categorical(RATE_CODE),
            Field::numeric(PASSENGER_COUNT),
            Field::numeric(TRIP_TIME_IN_SECS),
            Field::numeric(TRIP_DISTANCE),
            Field::categorical(PAYMENT_TYPE),
            Field::label(FARE_AMOUNT),
        ])
    }

    /// Schema of an inference trip, without the fare.
    pub fn inference_schema() -> Schema {
        Self::schema().without_labels()
    }

    /// The trip used for the single-record prediction demo. Its observed fare is 29.5.
    pub fn sample() -> Self {
        Self {
            vendor_id: "VTS".to_string(),
            rate_code: "1".to_string(),
            passenger_count: 1.0,
            trip_time_in_secs: 1140.0,
            trip_distance: 10.33,
            payment_type: "CSH".to_string(),
            fare_amount: None,
        }
    }

    /// Convert to a pipeline record. The fare is included only when known.
    pub fn to_record(&self) -> Record {
        let record = Record::new()
            .with(VENDOR_ID, self.vendor_id.as_str())
            .with(RATE_CODE, self.rate_code.as_str())
            .with(PASSENGER_COUNT, self.passenger_count)
            .with(TRIP_TIME_IN_SECS, self.trip_time_in_secs)
            .with(TRIP_DISTANCE, self.trip_distance)
            .with(PAYMENT_TYPE, self.payment_type.as_str());
        match self.fare_amount {
            Some(fare) => record.with(FARE_AMOUNT, fare),
            None => record,
        }
    }

    /// Read trips from any reader producing comma-separated text with a header.
    pub fn read_from<R: Read>(reader: R) -> Result<Vec<Self>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut trips = Vec::new();
        for result in rdr.deserialize() {
            let trip: TaxiTrip = result?;
            trips.push(trip);
        }
        Ok(trips)
    }

    /// Load trips from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let trips = Self::read_from(BufReader::new(file))?;
        debug!(path = %path.display(), rows = trips.len(), "loaded taxi trips");
        Ok(trips)
    }

    /// Load a labelled dataset; every row must carry a fare.
    pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let trips = Self::load(path)?;
        Dataset::new(Self::schema(), trips.iter().map(Self::to_record).collect())
    }
}
