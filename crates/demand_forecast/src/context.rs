//! Components shared by every command, built once from [`Settings`].

use std::sync::Arc;

use config::{RegistryBackend, Settings, StoreFactory};
use database::{ModelRegistry, ObjectStoreRegistry, PgRegistryStore, RegistryStore, create_pool};
use tracing::info;

use crate::ForecastError;

/// Resolved settings plus the storage clients and registry they select.
#[derive(Debug)]
pub struct AppContext {
    pub settings: Settings,
    pub stores: StoreFactory,
    pub registry: ModelRegistry,
}

impl AppContext {
    /// Builds the storage factory and the configured registry backend.
    pub async fn connect(settings: Settings) -> Result<Self, ForecastError> {
        let stores = StoreFactory::new(&settings);

        let backend: Arc<dyn RegistryStore> = match settings.registry_backend {
            RegistryBackend::ObjectStore => {
                let store = stores.store(settings.storage_scheme, &settings.curated_bucket)?;
                Arc::new(ObjectStoreRegistry::new(store, &settings.runs_table))
            }
            RegistryBackend::Postgres => {
                let url = settings
                    .database_url
                    .as_deref()
                    .ok_or_else(|| ForecastError::NotFound("DATABASE_URL is not set".to_string()))?;
                let pool = create_pool(url)
                    .await
                    .map_err(|e| ForecastError::transient("failed to connect to the registry database", e))?;
                Arc::new(PgRegistryStore::new(pool))
            }
        };

        info!(
            env = %settings.env,
            scheme = %settings.storage_scheme,
            backend = ?settings.registry_backend,
            "Initialized forecast context"
        );

        Ok(Self::with_registry(settings, stores, ModelRegistry::new(backend)))
    }

    /// Assembles a context from prebuilt parts.
    #[must_use]
    pub const fn with_registry(settings: Settings, stores: StoreFactory, registry: ModelRegistry) -> Self {
        Self {
            settings,
            stores,
            registry,
        }
    }
}
