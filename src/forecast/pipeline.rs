use tracing::debug;

use super::features::{FeatureBuilder, FeatureMatrix, FeatureRow};
use crate::config::Config;
use crate::data::{
    DataError, DataResult, DuplicatePolicy, PriceSeries, RawTable, SeriesNormalizer,
    TimestampReconciler,
};

/// Raw table to feature matrix: reconcile, normalize, build features.
///
/// Training and prediction both go through this type so features are derived
/// identically on both paths.
pub struct ForecastPipeline {
    reconciler: TimestampReconciler,
    normalizer: SeriesNormalizer,
    builder: FeatureBuilder,
}

impl ForecastPipeline {
    pub fn new(target_column: impl Into<String>, lags: usize, duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            reconciler: TimestampReconciler::default(),
            normalizer: SeriesNormalizer::new(target_column, duplicate_policy),
            builder: FeatureBuilder::new(lags),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.data.target_column.clone(),
            cfg.features.lags,
            cfg.data.duplicate_policy,
        )
    }

    /// Replace the timestamp reconciler, e.g. to support an extra layout.
    pub fn with_reconciler(mut self, reconciler: TimestampReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn lags(&self) -> usize {
        self.builder.lags()
    }

    /// Gap-free price series for the configured target column.
    pub fn normalize(&self, table: &RawTable) -> DataResult<PriceSeries> {
        let reconciled = self.reconciler.reconcile(table)?;
        debug!(layout = %reconciled.layout, consumed = ?reconciled.consumed, "layout detected");
        self.normalizer.normalize(table, &reconciled)
    }

    /// Full supervised dataset in timestamp order.
    pub fn build_dataset(&self, table: &RawTable) -> DataResult<FeatureMatrix> {
        let series = self.normalize(table)?;
        Ok(self.builder.build(&series))
    }

    /// Most recent fully populated row, the input for a one-step-ahead prediction.
    pub fn latest_feature_row(&self, table: &RawTable) -> DataResult<FeatureRow> {
        let series = self.normalize(table)?;
        self.builder
            .build(&series)
            .last()
            .cloned()
            .ok_or(DataError::InsufficientHistory {
                required: self.builder.lags() + 1,
                available: series.len(),
            })
    }
}

pub fn build_dataset(table: &RawTable, cfg: &Config) -> DataResult<FeatureMatrix> {
    ForecastPipeline::from_config(cfg).build_dataset(table)
}

pub fn latest_feature_row(table: &RawTable, cfg: &Config) -> DataResult<FeatureRow> {
    ForecastPipeline::from_config(cfg).latest_feature_row(table)
}
