//! Artifact URIs and byte transfer through `object_store`.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use config::{StorageScheme, StoreFactory};
use object_store::ObjectStoreExt;
use object_store::path::Path as ObjectStorePath;
use tracing::debug;

use crate::RegistryError;

/// Location of a stored artifact, `scheme://bucket/key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactUri {
    pub scheme: StorageScheme,
    pub bucket: String,
    pub key: String,
}

impl ArtifactUri {
    #[must_use]
    pub fn new(scheme: StorageScheme, bucket: &str, key: &str) -> Self {
        Self {
            scheme,
            bucket: bucket.to_string(),
            key: key.trim_start_matches('/').to_string(),
        }
    }

    /// Parses `scheme://bucket/key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use database::ArtifactUri;
    ///
    /// let uri = ArtifactUri::parse("s3://merlin-dev-curated/models/dev/model.json").unwrap();
    /// assert_eq!(uri.bucket, "merlin-dev-curated");
    /// assert_eq!(uri.key, "models/dev/model.json");
    /// ```
    pub fn parse(uri: &str) -> Result<Self, RegistryError> {
        let invalid = || RegistryError::InvalidUri(uri.to_string());

        let (scheme, rest) = uri.split_once("://").ok_or_else(invalid)?;
        let scheme = StorageScheme::from_str(scheme).map_err(|_| invalid())?;
        let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
        if bucket.is_empty() || key.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(scheme, bucket, key))
    }

    fn object_path(&self) -> ObjectStorePath {
        ObjectStorePath::from(self.key.as_str())
    }
}

impl fmt::Display for ArtifactUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

impl FromStr for ArtifactUri {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Reads the bytes stored at `uri`.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the object cannot be read.
pub async fn read_artifact(stores: &StoreFactory, uri: &ArtifactUri) -> Result<Bytes, RegistryError> {
    let store = stores.store(uri.scheme, &uri.bucket)?;
    let bytes = store.get(&uri.object_path()).await?.bytes().await?;
    debug!(artifact_uri = %uri, bytes = bytes.len(), "Read artifact");
    Ok(bytes)
}

/// Writes `data` to `uri`, replacing any existing object.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the write fails.
pub async fn write_artifact(stores: &StoreFactory, uri: &ArtifactUri, data: Bytes) -> Result<(), RegistryError> {
    let store = stores.store(uri.scheme, &uri.bucket)?;
    let len = data.len();
    store.put(&uri.object_path(), data.into()).await?;
    debug!(artifact_uri = %uri, bytes = len, "Wrote artifact");
    Ok(())
}
