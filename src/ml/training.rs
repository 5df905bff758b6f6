//! ML Model Training Pipeline
//!
//! Scaled training data in, trained model out.

use super::models::TrainedModel;
use super::smartcore::{SmartcoreLinearRegression, SmartcoreRandomForest};
use super::{ModelType, ValidationMetrics};
use crate::config::TrainingConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Training Dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl TrainingDataset {
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.len() != targets.len() {
            anyhow::bail!(
                "Feature and target count mismatch: {} features, {} targets",
                features.len(),
                targets.len()
            );
        }
        if let Some(row) = features.iter().find(|r| r.len() != feature_names.len()) {
            anyhow::bail!(
                "Feature count mismatch: {} values, {} names",
                row.len(),
                feature_names.len()
            );
        }
        Ok(Self {
            features,
            targets,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Model Trainer
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Fit the configured model type on a dataset
    pub fn train(&self, dataset: &TrainingDataset) -> Result<TrainedModel> {
        if dataset.is_empty() {
            anyhow::bail!("Cannot train on empty dataset");
        }

        info!(
            model = %self.config.model,
            samples = dataset.len(),
            features = dataset.feature_names.len(),
            "training model"
        );

        let model = match self.config.model {
            ModelType::RandomForest => TrainedModel::RandomForest(SmartcoreRandomForest::train(
                &dataset.features,
                &dataset.targets,
                SmartcoreRandomForest::parameters(&self.config),
                dataset.feature_names.clone(),
            )?),
            ModelType::LinearRegression => TrainedModel::LinearRegression(
                SmartcoreLinearRegression::train(
                    &dataset.features,
                    &dataset.targets,
                    dataset.feature_names.clone(),
                )?,
            ),
        };

        Ok(model)
    }
}

/// MAE, RMSE, MAPE (%) and R² of predictions against targets
pub fn calculate_metrics(predictions: &[f64], targets: &[f64]) -> Result<ValidationMetrics> {
    if predictions.len() != targets.len() {
        anyhow::bail!("Prediction and target count mismatch");
    }

    if predictions.is_empty() {
        anyhow::bail!("No predictions to evaluate");
    }

    let n = predictions.len() as f64;

    // Mean Absolute Error
    let mae: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / n;

    // Root Mean Square Error
    let mse: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n;
    let rmse = mse.sqrt();

    // Mean Absolute Percentage Error, over non-zero targets only
    let pct: Vec<f64> = predictions
        .iter()
        .zip(targets.iter())
        .filter(|(_, t)| t.abs() > 1e-10)
        .map(|(p, t)| ((p - t) / t).abs() * 100.0)
        .collect();
    let mape = if pct.is_empty() {
        0.0
    } else {
        pct.iter().sum::<f64>() / pct.len() as f64
    };

    // R-squared
    let mean_target: f64 = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
    let ss_res: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (t - p).powi(2))
        .sum();

    let r2 = if ss_tot.abs() < 1e-10 {
        0.0
    } else {
        1.0 - (ss_res / ss_tot)
    };

    Ok(ValidationMetrics::new(mae, rmse, mape, r2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::MLModel;
    use approx::assert_relative_eq;

    #[test]
    fn test_dataset_validation() {
        let names = vec!["f1".to_string(), "f2".to_string()];
        assert!(TrainingDataset::new(vec![vec![1.0, 2.0]], vec![1.0, 2.0], names.clone()).is_err());
        assert!(TrainingDataset::new(vec![vec![1.0]], vec![1.0], names.clone()).is_err());

        let ds = TrainingDataset::new(vec![vec![1.0, 2.0]], vec![3.0], names).unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_calculate_metrics() {
        let predictions = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let targets = vec![1.1, 2.1, 2.9, 4.2, 4.8];

        let metrics = calculate_metrics(&predictions, &targets).unwrap();

        assert!(metrics.mae < 0.3);
        assert!(metrics.rmse < 0.4);
        assert!(metrics.r2 > 0.9);
    }

    #[test]
    fn test_perfect_predictions() {
        let v = vec![10.0, 20.0, 30.0];
        let m = calculate_metrics(&v, &v).unwrap();
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mape, 0.0);
        assert_relative_eq!(m.r2, 1.0);
    }

    #[test]
    fn test_metrics_errors() {
        assert!(calculate_metrics(&[], &[]).is_err());
        assert!(calculate_metrics(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_train_dispatches_on_model_type() {
        let features: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..8).map(|i| 2.0 * i as f64 + 1.0).collect();
        let dataset = TrainingDataset::new(features, targets, vec!["x".to_string()]).unwrap();

        let config = TrainingConfig {
            model: ModelType::LinearRegression,
            ..TrainingConfig::default()
        };
        let model = ModelTrainer::new(config).train(&dataset).unwrap();
        assert_eq!(model.model_type(), ModelType::LinearRegression);
        assert_eq!(model.metadata().feature_names, vec!["x"]);
    }
}
