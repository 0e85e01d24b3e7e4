//! In-process predictions from the latest registered artifact.

use async_trait::async_trait;
use config::{DEMAND_FORECAST, StoreFactory};
use database::{ArtifactUri, ModelRegistry, read_artifact};
use ml_model::GradientBoostedRegressor;
use serde_json::{Value, json};
use tracing::info;

use super::{Forecaster, instances_to_rows};
use crate::ForecastError;

/// Serves predictions from a model loaded once at construction.
#[derive(Debug, Clone)]
pub struct LocalForecaster {
    model: GradientBoostedRegressor,
    artifact_uri: String,
}

impl LocalForecaster {
    /// Loads the latest registered demand forecast model.
    ///
    /// Fails with [`ForecastError::NotFound`] if no model is registered.
    pub async fn from_registry(registry: &ModelRegistry, stores: &StoreFactory) -> Result<Self, ForecastError> {
        let metadata = registry.latest_model(DEMAND_FORECAST).await?.ok_or_else(|| {
            ForecastError::NotFound(format!("no registered {DEMAND_FORECAST} model for local inference"))
        })?;
        Self::from_artifact(&metadata.artifact_uri, stores).await
    }

    /// Downloads the artifact at `uri` into a scratch directory and loads it.
    pub async fn from_artifact(uri: &str, stores: &StoreFactory) -> Result<Self, ForecastError> {
        let parsed = ArtifactUri::parse(uri)?;
        let bytes = read_artifact(stores, &parsed).await?;

        let scratch = tempfile::tempdir().map_err(|e| ForecastError::transient("failed to create scratch directory", e))?;
        let path = scratch.path().join("model.json");
        std::fs::write(&path, &bytes)
            .map_err(|e| ForecastError::transient(format!("failed to write {}", path.display()), e))?;
        let model = GradientBoostedRegressor::load(&path)?;

        info!(artifact_uri = uri, trees = model.n_trees(), "Loaded local model");
        Ok(Self {
            model,
            artifact_uri: uri.to_string(),
        })
    }

    #[must_use]
    pub fn artifact_uri(&self) -> &str {
        &self.artifact_uri
    }
}

#[async_trait]
impl Forecaster for LocalForecaster {
    async fn predict(&self, payload: &Value) -> Result<Value, ForecastError> {
        let rows = instances_to_rows(payload, self.model.feature_names())?;
        let predictions = self.model.predict_rows(&rows);
        Ok(json!({ "predictions": predictions }))
    }
}
