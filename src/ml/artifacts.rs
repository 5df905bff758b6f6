//! Persistence of trained models and fitted scalers
//!
//! Layout of an artifact directory:
//! - `model.bin` - bincode-encoded [`TrainedModel`]
//! - `scaler_x.json`, `scaler_y.json` - fitted [`MinMaxScaler`]s
//! - `metadata.json` - [`ModelMetadata`], for humans and tooling

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::models::{MLModel, TrainedModel};
use super::scaling::MinMaxScaler;
use super::ModelMetadata;

const MODEL_FILE: &str = "model.bin";
const SCALER_X_FILE: &str = "scaler_x.json";
const SCALER_Y_FILE: &str = "scaler_y.json";
const METADATA_FILE: &str = "metadata.json";

/// A trained model together with the scalers fitted alongside it
#[derive(Debug)]
pub struct Artifacts {
    pub model: TrainedModel,
    pub scaler_x: MinMaxScaler,
    pub scaler_y: MinMaxScaler,
}

impl Artifacts {
    pub fn metadata(&self) -> &ModelMetadata {
        self.model.metadata()
    }
}

/// Reads and writes [`Artifacts`] in a directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, artifacts: &Artifacts) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create artifact dir {}", self.dir.display()))?;

        let bytes = bincode::serialize(&artifacts.model)
            .map_err(|e| anyhow::anyhow!("Failed to serialize model: {}", e))?;
        let model_path = self.dir.join(MODEL_FILE);
        fs::write(&model_path, bytes)
            .with_context(|| format!("failed to write {}", model_path.display()))?;

        self.write_json(SCALER_X_FILE, &artifacts.scaler_x)?;
        self.write_json(SCALER_Y_FILE, &artifacts.scaler_y)?;
        self.write_json(METADATA_FILE, artifacts.metadata())?;

        info!(
            dir = %self.dir.display(),
            model_id = %artifacts.metadata().model_id,
            "artifacts saved"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Artifacts> {
        let model_path = self.dir.join(MODEL_FILE);
        let bytes = fs::read(&model_path)
            .with_context(|| format!("failed to read {} (train a model first)", model_path.display()))?;
        let model: TrainedModel = bincode::deserialize(&bytes)
            .map_err(|e| anyhow::anyhow!("Failed to deserialize model: {}", e))?;

        let artifacts = Artifacts {
            model,
            scaler_x: self.read_json(SCALER_X_FILE)?,
            scaler_y: self.read_json(SCALER_Y_FILE)?,
        };

        if artifacts.scaler_x.n_features() != artifacts.metadata().feature_names.len() {
            anyhow::bail!(
                "Feature scaler has {} columns but model expects {}",
                artifacts.scaler_x.n_features(),
                artifacts.metadata().feature_names.len()
            );
        }

        Ok(artifacts)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}
