//! taxi-fares: train a fare model, save it, evaluate it and predict one trip.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use taxi_fares::config::{AppConfig, TrainerConfig};
use taxi_fares::dataset::TaxiTrip;
use taxi_fares::engine::PredictionEngine;
use taxi_fares::model::Trainer;
use taxi_fares::pipeline::Pipeline;
use tracing::info;

/// Observed fare of the sample trip.
const SAMPLE_FARE: f32 = 29.5;

#[derive(Parser, Debug)]
#[command(name = "taxi-fares", version, about = "Train and evaluate a taxi fare regressor")]
struct Cli {
    /// Directory containing Data/taxi-fare-train.csv and Data/taxi-fare-test.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taxi_fares=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    match config.trainer.clone() {
        TrainerConfig::FastTree(t) => run(&config, t),
        TrainerConfig::RegressionTree(t) => run(&config, t),
        TrainerConfig::Linear(t) => run(&config, t),
    }
}

fn run<T: Trainer>(config: &AppConfig, trainer: T) -> Result<()> {
    let mut engine = PredictionEngine::new(Pipeline::taxi_fares(trainer));

    let train_path = config.train_path();
    let train = TaxiTrip::load_dataset(&train_path)
        .with_context(|| format!("loading training data from {}", train_path.display()))?;
    engine.train(&train).context("training the pipeline")?;

    let model_path = config.model_path();
    engine
        .save(&model_path)
        .with_context(|| format!("saving the model to {}", model_path.display()))?;
    info!(path = %model_path.display(), "model written");

    let test_path = config.test_path();
    let test = TaxiTrip::load_dataset(&test_path)
        .with_context(|| format!("loading test data from {}", test_path.display()))?;
    let metrics = engine.evaluate(&test).context("evaluating the model")?;
    println!("RSquared = {}", metrics.r_squared);
    println!("MAE = {:.4}", metrics.mae);
    println!("RMSE = {:.4}", metrics.rmse);

    let prediction = engine
        .predict(&TaxiTrip::sample().to_record())
        .context("predicting the sample trip")?;
    println!("Predicted fare: {}, actual fare: {}", prediction, SAMPLE_FARE);
    Ok(())
}
