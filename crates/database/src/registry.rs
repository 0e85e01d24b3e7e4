//! Registration and lookup of trained models.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{MetricValue, ModelMetadata, RecordField, RegistryError, RegistryStore};

/// Rounds half away from zero to 6 decimals. Values too large to scale are
/// returned unchanged.
#[must_use]
pub fn round_metric(value: f64) -> f64 {
    let scaled = value * 1e6;
    if scaled.is_finite() {
        scaled.round() / 1e6
    } else {
        value
    }
}

/// Model registry over a [`RegistryStore`] backend.
#[derive(Clone)]
pub struct ModelRegistry {
    store: Arc<dyn RegistryStore>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }

    /// Registers a new model and returns its generated id.
    ///
    /// Metrics that are not finite numbers are dropped with a warning, the
    /// rest are rounded to 6 decimals.
    pub async fn register_model<I, K, V>(
        &self,
        artifact_uri: &str,
        metrics: I,
        model_type: &str,
    ) -> Result<Uuid, RegistryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetricValue>,
    {
        let mut clean = BTreeMap::new();
        for (key, value) in metrics {
            let key = key.into();
            let value = value.into();
            match value.as_finite() {
                Some(v) => {
                    clean.insert(key, round_metric(v));
                }
                None => warn!(metric = %key, value = %value, "Dropping non-numeric metric"),
            }
        }

        let record = ModelMetadata {
            model_id: Uuid::new_v4(),
            model_type: model_type.to_string(),
            artifact_uri: artifact_uri.to_string(),
            metrics: clean,
            created_at: Utc::now(),
        };
        self.store.put(&record).await?;

        info!(model_id = %record.model_id, model_type, artifact_uri, "Registered model");
        Ok(record.model_id)
    }

    /// The most recently created model of `model_type`, if any.
    ///
    /// On equal timestamps the record scanned first wins.
    pub async fn latest_model(&self, model_type: &str) -> Result<Option<ModelMetadata>, RegistryError> {
        let records = self.store.scan_eq(RecordField::ModelType, model_type).await?;
        Ok(latest_of(records))
    }
}

fn latest_of(records: Vec<ModelMetadata>) -> Option<ModelMetadata> {
    records.into_iter().reduce(|best, candidate| {
        if candidate.created_at > best.created_at {
            candidate
        } else {
            best
        }
    })
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry").finish_non_exhaustive()
    }
}
