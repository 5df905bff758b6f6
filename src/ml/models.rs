//! ML Model Definitions

use super::smartcore::{SmartcoreLinearRegression, SmartcoreRandomForest};
use super::{FeatureVector, ModelMetadata, ModelType, Prediction, ValidationMetrics};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Trait for ML models
pub trait MLModel: Send + Sync {
    /// Predict many rows at once
    fn predict_batch(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Get model metadata
    fn metadata(&self) -> &ModelMetadata;

    /// Predict a value from features
    fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let expected = &self.metadata().feature_names;
        if &features.feature_names != expected {
            anyhow::bail!(
                "Feature mismatch: model expects [{}], got [{}]",
                expected.join(", "),
                features.feature_names.join(", ")
            );
        }

        let predictions = self.predict_batch(std::slice::from_ref(&features.features))?;
        let Some(value) = predictions.first() else {
            anyhow::bail!("Model returned empty predictions");
        };
        Ok(Prediction::new(*value))
    }

    /// Get model type
    fn model_type(&self) -> ModelType {
        self.metadata().model_type
    }
}

/// Any trained regressor this crate can persist
#[derive(Debug, Serialize, Deserialize)]
pub enum TrainedModel {
    RandomForest(SmartcoreRandomForest),
    LinearRegression(SmartcoreLinearRegression),
}

impl TrainedModel {
    /// Replace the stored metrics, e.g. with held-out results in original units
    pub fn set_validation_metrics(&mut self, metrics: ValidationMetrics) {
        match self {
            Self::RandomForest(m) => m.metadata.validation_metrics = metrics,
            Self::LinearRegression(m) => m.metadata.validation_metrics = metrics,
        }
    }
}

impl MLModel for TrainedModel {
    fn predict_batch(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self {
            Self::RandomForest(m) => m.predict_batch(x),
            Self::LinearRegression(m) => m.predict_batch(x),
        }
    }

    fn metadata(&self) -> &ModelMetadata {
        match self {
            Self::RandomForest(m) => &m.metadata,
            Self::LinearRegression(m) => &m.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> TrainedModel {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, (i * i) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| r[0] + 0.5 * r[1]).collect();
        let names = vec!["a".to_string(), "b".to_string()];
        TrainedModel::LinearRegression(SmartcoreLinearRegression::train(&x, &y, names).unwrap())
    }

    #[test]
    fn test_predict_single_row() {
        let model = linear();
        let fv = FeatureVector::new(vec![2.0, 4.0], vec!["a".to_string(), "b".to_string()]).unwrap();
        let pred = model.predict(&fv).unwrap();
        assert!((pred.value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_predict_rejects_other_features() {
        let model = linear();
        let fv = FeatureVector::new(vec![2.0, 4.0], vec!["a".to_string(), "c".to_string()]).unwrap();
        assert!(model.predict(&fv).is_err());
    }

    #[test]
    fn test_set_validation_metrics() {
        let mut model = linear();
        let metrics = ValidationMetrics::new(1.0, 2.0, 3.0, 0.5);
        model.set_validation_metrics(metrics);
        assert_eq!(model.metadata().validation_metrics, metrics);
    }
}
