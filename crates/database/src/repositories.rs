//! Registry storage backends.

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt, PutMode, PutPayload};
use tracing::debug;

use crate::{ModelMetadata, RecordField, RegistryError};

/// Persistence seam for registry records.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Stores a new record. Fails with [`RegistryError::AlreadyExists`]
    /// instead of overwriting.
    async fn put(&self, record: &ModelMetadata) -> Result<(), RegistryError>;

    /// Every record whose `field` equals `value`, in a stable scan order.
    async fn scan_eq(&self, field: RecordField, value: &str) -> Result<Vec<ModelMetadata>, RegistryError>;
}

/// One JSON document per record at `{prefix}/{model_id}.json`.
#[derive(Debug, Clone)]
pub struct ObjectStoreRegistry {
    store: Arc<dyn ObjectStore>,
    prefix: ObjectStorePath,
}

impl ObjectStoreRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            store,
            prefix: ObjectStorePath::from(prefix),
        }
    }

    fn record_path(&self, record: &ModelMetadata) -> ObjectStorePath {
        ObjectStorePath::from(format!("{}/{}.json", self.prefix, record.model_id))
    }
}

#[async_trait]
impl RegistryStore for ObjectStoreRegistry {
    async fn put(&self, record: &ModelMetadata) -> Result<(), RegistryError> {
        let body = serde_json::to_vec(record)?;
        let result = self
            .store
            .put_opts(&self.record_path(record), PutPayload::from(body), PutMode::Create.into())
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(object_store::Error::AlreadyExists { .. }) => Err(RegistryError::AlreadyExists(record.model_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn scan_eq(&self, field: RecordField, value: &str) -> Result<Vec<ModelMetadata>, RegistryError> {
        let mut objects: Vec<_> = self.store.list(Some(&self.prefix)).try_collect().await?;
        objects.sort_by(|a, b| a.location.cmp(&b.location));

        let mut records = Vec::new();
        for meta in objects {
            if meta.location.extension() != Some("json") {
                continue;
            }
            let bytes = self.store.get(&meta.location).await?.bytes().await?;
            let record: ModelMetadata =
                serde_json::from_slice(&bytes).map_err(|source| RegistryError::CorruptRecord {
                    path: meta.location.to_string(),
                    source,
                })?;
            if field.value_of(&record) == value {
                records.push(record);
            }
        }
        debug!(prefix = %self.prefix, matched = records.len(), "Scanned registry records");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use object_store::memory::InMemory;
    use uuid::Uuid;

    use super::*;

    fn record(model_type: &str) -> ModelMetadata {
        ModelMetadata {
            model_id: Uuid::new_v4(),
            model_type: model_type.to_string(),
            artifact_uri: "memory://curated/model.json".to_string(),
            metrics: BTreeMap::from([("r2".to_string(), 0.5)]),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_put_then_scan() {
        let registry = ObjectStoreRegistry::new(Arc::new(InMemory::new()), "merlin-dev-runs");
        let forecast = record("demand_forecast");
        registry.put(&forecast).await.unwrap();
        registry.put(&record("other")).await.unwrap();

        let found = registry.scan_eq(RecordField::ModelType, "demand_forecast").await.unwrap();

        assert_eq!(found, vec![forecast]);
    }

    #[tokio::test]
    async fn test_put_never_overwrites() {
        let registry = ObjectStoreRegistry::new(Arc::new(InMemory::new()), "runs");
        let mut first = record("demand_forecast");
        registry.put(&first).await.unwrap();

        first.artifact_uri = "memory://curated/other.json".to_string();
        let err = registry.put(&first).await.unwrap_err();

        assert!(matches!(err, RegistryError::AlreadyExists(id) if id == first.model_id));
        let stored = registry.scan_eq(RecordField::ModelType, "demand_forecast").await.unwrap();
        assert_eq!(stored[0].artifact_uri, "memory://curated/model.json");
    }

    #[tokio::test]
    async fn test_unreadable_record_fails_the_scan() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let registry = ObjectStoreRegistry::new(Arc::clone(&store), "runs");
        let mut old = record("demand_forecast");
        old.artifact_uri = "old".to_string();
        registry.put(&old).await.unwrap();
        store
            .put(
                &ObjectStorePath::from("runs/ffffffff-newer.json"),
                PutPayload::from_static(br#"{"model_id": "ffff"#),
            )
            .await
            .unwrap();

        let err = registry.scan_eq(RecordField::ModelType, "demand_forecast").await.unwrap_err();

        assert!(matches!(err, RegistryError::CorruptRecord { ref path, .. } if path == "runs/ffffffff-newer.json"));
    }

    #[tokio::test]
    async fn test_records_are_stored_under_prefix() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let registry = ObjectStoreRegistry::new(Arc::clone(&store), "merlin-dev-runs");
        let forecast = record("demand_forecast");
        registry.put(&forecast).await.unwrap();

        let path = ObjectStorePath::from(format!("merlin-dev-runs/{}.json", forecast.model_id));
        assert!(store.head(&path).await.is_ok());
    }
}
