//! Machine Learning Module
//!
//! Regression on top of the feature matrix:
//! - Min-max scaling of features and labels
//! - SmartCore random forest and linear regression models
//! - Training with validation metrics
//! - Persistence of trained models and fitted scalers

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod artifacts;
pub mod models;
pub mod scaling;
pub mod smartcore;
pub mod training;

pub use artifacts::{ArtifactStore, Artifacts};
pub use models::{MLModel, TrainedModel};
pub use scaling::MinMaxScaler;
pub use training::{ModelTrainer, TrainingDataset};

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    RandomForest,
    LinearRegression,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RandomForest => write!(f, "random_forest"),
            Self::LinearRegression => write!(f, "linear_regression"),
        }
    }
}

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub validation_metrics: ValidationMetrics,
    pub feature_names: Vec<String>,
}

/// Validation Metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Mean Absolute Percentage Error
    pub r2: f64,   // R-squared
}

impl ValidationMetrics {
    pub fn new(mae: f64, rmse: f64, mape: f64, r2: f64) -> Self {
        Self {
            mae,
            rmse,
            mape,
            r2,
        }
    }
}

/// Feature Vector for ML models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.len() != feature_names.len() {
            anyhow::bail!(
                "Feature count mismatch: {} features, {} names",
                features.len(),
                feature_names.len()
            );
        }
        Ok(Self {
            features,
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

/// ML Prediction Result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub value: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

impl Prediction {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            lower_bound: None,
            upper_bound: None,
        }
    }

    pub fn with_bounds(value: f64, lower: f64, upper: f64) -> Self {
        Self {
            value,
            lower_bound: Some(lower),
            upper_bound: Some(upper),
        }
    }
}
