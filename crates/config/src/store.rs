//! Cached object store clients.
//!
//! One client per (scheme, bucket, region), built on first use and shared by
//! reference afterwards.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use tracing::debug;

use crate::{ConfigError, Settings, StorageScheme};

/// Cache key for a storage client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub scheme: StorageScheme,
    pub bucket: String,
    pub region: String,
}

/// Builds and caches object store clients.
pub struct StoreFactory {
    region: String,
    local_root: PathBuf,
    cache: Mutex<HashMap<StoreKey, Arc<dyn ObjectStore>>>,
}

impl StoreFactory {
    /// Creates a factory for the region and local root of `settings`.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self::with_region(&settings.region, settings.local_store_root.clone())
    }

    #[must_use]
    pub fn with_region(region: &str, local_root: PathBuf) -> Self {
        Self {
            region: region.to_string(),
            local_root,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn key(&self, scheme: StorageScheme, bucket: &str) -> StoreKey {
        StoreKey {
            scheme,
            bucket: bucket.to_string(),
            region: self.region.clone(),
        }
    }

    /// Pins a prebuilt store for a bucket, replacing any cached client.
    pub fn register(&self, scheme: StorageScheme, bucket: &str, store: Arc<dyn ObjectStore>) {
        let key = self.key(scheme, bucket);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, store);
    }

    /// Returns the cached client for a bucket, building it on first use.
    pub fn store(
        &self,
        scheme: StorageScheme,
        bucket: &str,
    ) -> Result<Arc<dyn ObjectStore>, ConfigError> {
        let key = self.key(scheme, bucket);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(store) = cache.get(&key) {
            return Ok(Arc::clone(store));
        }

        let store = self.build(&key)?;
        debug!(scheme = %key.scheme, bucket = %key.bucket, region = %key.region, "Built object store client");
        cache.insert(key, Arc::clone(&store));
        Ok(store)
    }

    /// Number of cached clients.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn build(&self, key: &StoreKey) -> Result<Arc<dyn ObjectStore>, ConfigError> {
        let store_error = |source| ConfigError::Store {
            scheme: key.scheme,
            bucket: key.bucket.clone(),
            source,
        };

        let store: Arc<dyn ObjectStore> = match key.scheme {
            StorageScheme::S3 => Arc::new(
                AmazonS3Builder::from_env()
                    .with_bucket_name(&key.bucket)
                    .with_region(&key.region)
                    .build()
                    .map_err(store_error)?,
            ),
            StorageScheme::File => {
                let root = self.local_root.join(&key.bucket);
                std::fs::create_dir_all(&root).map_err(|source| ConfigError::Io {
                    path: root.clone(),
                    source,
                })?;
                Arc::new(LocalFileSystem::new_with_prefix(&root).map_err(store_error)?)
            }
            StorageScheme::Memory => Arc::new(InMemory::new()),
        };

        Ok(store)
    }
}

impl std::fmt::Debug for StoreFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFactory")
            .field("region", &self.region)
            .field("local_root", &self.local_root)
            .field("cached", &self.cached())
            .finish()
    }
}
