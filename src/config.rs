use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::DuplicatePolicy;
use crate::ml::ModelType;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "EPF__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeaturesConfig,
    pub training: TrainingConfig,
    pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub path: PathBuf,
    /// Exact, case-sensitive CSV header of the price column
    pub target_column: String,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/electricity_dah_prices.csv"),
            target_column: "france".to_string(),
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Number of lagged prices per row (24 = one day of hourly data)
    pub lags: usize,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self { lags: 24 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Share of the most recent rows held out for evaluation
    pub test_fraction: f64,
    pub model: ModelType,
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            model: ModelType::RandomForest,
            n_trees: 50,
            max_depth: Some(10),
            min_samples_split: 5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Trained model, fitted scalers and metadata
    pub dir: PathBuf,
    /// Test-set predictions written after training
    pub results_dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            results_dir: PathBuf::from("results"),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (if present), then `EPF__*` environment variables.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let cfg: Config = figment.extract()?;
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }

    /// Validate settings for sanity
    pub fn validate(&self) -> Result<(), String> {
        if self.data.target_column.trim().is_empty() {
            return Err("data.target_column cannot be empty".to_string());
        }

        if self.features.lags == 0 {
            return Err("features.lags must be at least 1".to_string());
        }

        if !(self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0) {
            return Err("training.test_fraction must be between 0 and 1 (exclusive)".to_string());
        }

        if self.training.n_trees == 0 {
            return Err("training.n_trees must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.features.lags, 24);
        assert_eq!(cfg.data.target_column, "france");
        assert_eq!(cfg.training.test_fraction, 0.2);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.training.test_fraction = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.features.lags = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.data.target_column = " ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "forecaster.toml",
                r#"
                [data]
                target_column = "germany"
                duplicate_policy = "keep_last"

                [features]
                lags = 48
                "#,
            )?;
            jail.set_env("EPF__TRAINING__MODEL", "linear_regression");

            let cfg = Config::load_from("forecaster.toml").expect("config loads");
            assert_eq!(cfg.data.target_column, "germany");
            assert_eq!(cfg.data.duplicate_policy, DuplicatePolicy::KeepLast);
            assert_eq!(cfg.features.lags, 48);
            assert_eq!(cfg.training.model, ModelType::LinearRegression);
            // untouched sections keep their defaults
            assert_eq!(cfg.training.n_trees, 50);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = Config::load_from("does-not-exist.toml").expect("defaults load");
            assert_eq!(cfg.features.lags, 24);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_value_fails_load() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "[training]\ntest_fraction = 0.0\n")?;
            assert!(Config::load_from("bad.toml").is_err());
            Ok(())
        });
    }
}
