//! SmartCore model wrappers
//!
//! Random forest and ordinary least squares regressors over dense `f64`
//! matrices. Both wrappers are fully serde-serializable so they can be written
//! to disk with bincode.

use super::{ModelMetadata, ModelType, ValidationMetrics};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};

use crate::config::TrainingConfig;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Ols = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Convert row-major feature vectors to a SmartCore matrix.
pub fn to_dense_matrix(x: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    let Some(first) = x.first() else {
        anyhow::bail!("Cannot build a matrix from zero rows");
    };

    let n_samples = x.len();
    let n_features = first.len();

    let mut flat_data = Vec::with_capacity(n_samples * n_features);
    for row in x {
        if row.len() != n_features {
            anyhow::bail!("All feature vectors must have the same length");
        }
        flat_data.extend_from_slice(row);
    }

    Ok(DenseMatrix::new(n_samples, n_features, flat_data, false))
}

fn check_training_input(x: &[Vec<f64>], y: &[f64]) -> Result<()> {
    if x.is_empty() || y.is_empty() {
        anyhow::bail!("Cannot train on empty dataset");
    }

    if x.len() != y.len() {
        anyhow::bail!(
            "Feature and target count mismatch: {} features, {} targets",
            x.len(),
            y.len()
        );
    }
    Ok(())
}

fn new_metadata(
    model_type: ModelType,
    training_samples: usize,
    validation_metrics: ValidationMetrics,
    feature_names: Vec<String>,
) -> ModelMetadata {
    ModelMetadata {
        model_id: format!("{}_{}", model_type, uuid::Uuid::new_v4()),
        model_type,
        version: env!("CARGO_PKG_VERSION").to_string(),
        trained_at: chrono::Utc::now(),
        training_samples,
        validation_metrics,
        feature_names,
    }
}

/// SmartCore RandomForest Model Wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct SmartcoreRandomForest {
    pub metadata: ModelMetadata,
    model: Forest,
    /// Training parameters for reproducibility
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
}

impl SmartcoreRandomForest {
    /// Conservative defaults: 50 trees, depth 10, split at 5 samples
    pub fn default_parameters() -> RandomForestRegressorParameters {
        Self::parameters(&TrainingConfig::default())
    }

    pub fn parameters(cfg: &TrainingConfig) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: cfg.max_depth,
            min_samples_leaf: 2,
            min_samples_split: cfg.min_samples_split,
            n_trees: cfg.n_trees,
            m: None, // Use sqrt(n_features) by default
            keep_samples: false,
            seed: cfg.seed,
        }
    }

    /// Train a new RandomForest model
    pub fn train(
        x: &[Vec<f64>],
        y: &[f64],
        params: RandomForestRegressorParameters,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        check_training_input(x, y)?;

        let n_trees = params.n_trees;
        let max_depth = params.max_depth;
        let min_samples_split = params.min_samples_split;

        let x_matrix = to_dense_matrix(x)?;
        let y_vec = y.to_vec();

        let model = RandomForestRegressor::fit(&x_matrix, &y_vec, params)
            .map_err(|e| anyhow::anyhow!("RandomForest training failed: {:?}", e))?;

        let predictions = model
            .predict(&x_matrix)
            .map_err(|e| anyhow::anyhow!("Prediction failed during validation: {:?}", e))?;
        let metrics = super::training::calculate_metrics(&predictions, y)?;

        Ok(Self {
            metadata: new_metadata(ModelType::RandomForest, x.len(), metrics, feature_names),
            model,
            n_trees,
            max_depth,
            min_samples_split,
        })
    }

    pub fn predict_batch(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let x_matrix = to_dense_matrix(x)?;
        self.model
            .predict(&x_matrix)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))
    }
}

/// SmartCore ordinary least squares wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct SmartcoreLinearRegression {
    pub metadata: ModelMetadata,
    model: Ols,
}

impl SmartcoreLinearRegression {
    pub fn train(x: &[Vec<f64>], y: &[f64], feature_names: Vec<String>) -> Result<Self> {
        check_training_input(x, y)?;

        let x_matrix = to_dense_matrix(x)?;
        let y_vec = y.to_vec();

        // SVD tolerates rank-deficient inputs such as a constant month column
        let params = LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let model = LinearRegression::fit(&x_matrix, &y_vec, params)
            .map_err(|e| anyhow::anyhow!("Linear regression training failed: {:?}", e))?;

        let predictions = model
            .predict(&x_matrix)
            .map_err(|e| anyhow::anyhow!("Prediction failed during validation: {:?}", e))?;
        let metrics = super::training::calculate_metrics(&predictions, y)?;

        Ok(Self {
            metadata: new_metadata(ModelType::LinearRegression, x.len(), metrics, feature_names),
            model,
        })
    }

    pub fn predict_batch(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let x_matrix = to_dense_matrix(x)?;
        self.model
            .predict(&x_matrix)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))
    }
}
