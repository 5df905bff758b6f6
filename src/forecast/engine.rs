use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::features::feature_names;
use super::pipeline::ForecastPipeline;
use crate::config::Config;
use crate::data::RawTable;
use crate::ml::training::calculate_metrics;
use crate::ml::{
    ArtifactStore, Artifacts, FeatureVector, MLModel, MinMaxScaler, ModelTrainer, Prediction,
    TrainingDataset, ValidationMetrics,
};

/// z-score of a 95% interval around a point forecast
const INTERVAL_Z: f64 = 1.96;

/// Outcome of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub model_id: String,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Held-out metrics in original price units
    pub metrics: ValidationMetrics,
    pub predictions_path: PathBuf,
}

/// Price forecast for the most recent feature row
#[derive(Debug, Clone, Serialize)]
pub struct PriceForecast {
    pub timestamp: NaiveDateTime,
    /// Model output before inverse label scaling
    pub scaled: f64,
    /// Price in original units, bounded by the held-out RMSE
    pub prediction: Prediction,
}

#[derive(Debug, Serialize)]
struct PredictionRecord {
    timestamp: NaiveDateTime,
    actual: f64,
    predicted: f64,
}

/// Train and predict flows on top of the feature pipeline
pub struct ForecastEngine {
    cfg: Config,
    pipeline: ForecastPipeline,
    store: ArtifactStore,
}

impl ForecastEngine {
    pub fn new(cfg: Config) -> Self {
        let pipeline = ForecastPipeline::from_config(&cfg);
        let store = ArtifactStore::new(cfg.artifacts.dir.clone());
        Self {
            cfg,
            pipeline,
            store,
        }
    }

    fn load_table(&self) -> Result<RawTable> {
        let path = &self.cfg.data.path;
        RawTable::from_path(path).with_context(|| format!("failed to read CSV {}", path.display()))
    }

    /// Build features, fit scalers and model on the oldest rows, evaluate on the
    /// most recent ones, then persist everything.
    pub fn train(&self) -> Result<TrainingReport> {
        let table = self.load_table()?;
        let dataset = self
            .pipeline
            .build_dataset(&table)
            .context("failed to build feature dataset")?;
        let (train, test) = dataset
            .split_chronological(self.cfg.training.test_fraction)
            .context("failed to split dataset")?;

        info!(
            rows = dataset.len(),
            train_rows = train.len(),
            test_rows = test.len(),
            "dataset split chronologically"
        );

        let (train_x, train_y) = (train.x(), train.y());
        let scaler_x = MinMaxScaler::fit(&train_x)?;
        let scaler_y = MinMaxScaler::fit_column(&train_y)?;

        let train_set = TrainingDataset::new(
            scaler_x.transform(&train_x)?,
            scaler_y.transform_column(&train_y)?,
            dataset.feature_names(),
        )?;
        let mut model = ModelTrainer::new(self.cfg.training.clone()).train(&train_set)?;

        let scaled_predictions = model.predict_batch(&scaler_x.transform(&test.x())?)?;
        let predicted = scaler_y.inverse_transform_column(&scaled_predictions)?;
        let actual = test.y();
        let metrics = calculate_metrics(&predicted, &actual)?;

        info!(
            rmse = metrics.rmse,
            mae = metrics.mae,
            mape = metrics.mape,
            r2 = metrics.r2,
            "test metrics (original units)"
        );

        model.set_validation_metrics(metrics);
        let artifacts = Artifacts {
            model,
            scaler_x,
            scaler_y,
        };
        self.store.save(&artifacts)?;

        let predictions_path =
            write_predictions(&self.cfg.artifacts.results_dir, &test.timestamps(), &actual, &predicted)?;

        Ok(TrainingReport {
            model_id: artifacts.metadata().model_id.clone(),
            train_rows: train.len(),
            test_rows: test.len(),
            metrics,
            predictions_path,
        })
    }

    /// Predict from the latest fully populated feature row with the saved model.
    pub fn predict(&self) -> Result<PriceForecast> {
        let table = self.load_table()?;
        let row = self
            .pipeline
            .latest_feature_row(&table)
            .context("failed to build latest feature row")?;

        let artifacts = self.store.load()?;
        let names = feature_names(self.pipeline.lags());
        if artifacts.metadata().feature_names != names {
            anyhow::bail!(
                "Model {} was trained on {} features but the pipeline produces {} (check features.lags)",
                artifacts.metadata().model_id,
                artifacts.metadata().feature_names.len(),
                names.len()
            );
        }

        let scaled_input = artifacts.scaler_x.transform_row(&row.features())?;
        let scaled = artifacts
            .model
            .predict(&FeatureVector::new(scaled_input, names)?)?
            .value;
        let price = artifacts.scaler_y.inverse_transform_row(&[scaled])?[0];

        let margin = INTERVAL_Z * artifacts.metadata().validation_metrics.rmse;
        info!(timestamp = %row.timestamp, scaled, price, "price predicted");

        Ok(PriceForecast {
            timestamp: row.timestamp,
            scaled,
            prediction: Prediction::with_bounds(price, price - margin, price + margin),
        })
    }
}

fn write_predictions(
    dir: &Path,
    timestamps: &[NaiveDateTime],
    actual: &[f64],
    predicted: &[f64],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create results dir {}", dir.display()))?;
    let path = dir.join("predictions.csv");

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for ((timestamp, actual), predicted) in timestamps.iter().zip(actual).zip(predicted) {
        writer.serialize(PredictionRecord {
            timestamp: *timestamp,
            actual: *actual,
            predicted: *predicted,
        })?;
    }
    writer.flush()?;

    Ok(path)
}
