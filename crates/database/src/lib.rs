//! Model registry for trained forecast artifacts.
//!
//! Records are written once and never updated. Two backends share the
//! [`RegistryStore`] seam: one JSON document per record in object storage,
//! or a `model_runs` table in `PostgreSQL`.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod models;
mod path_utils;
mod postgres;
mod registry;
mod repositories;

pub use models::{MetricValue, ModelMetadata, RecordField};
pub use path_utils::{ArtifactUri, read_artifact, write_artifact};
pub use postgres::PgRegistryStore;
pub use registry::{ModelRegistry, round_metric};
pub use repositories::{ObjectStoreRegistry, RegistryStore};

/// Errors raised by registry backends and artifact storage.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry record {0} already exists")]
    AlreadyExists(Uuid),

    #[error("invalid artifact URI `{0}`, expected scheme://bucket/key")]
    InvalidUri(String),

    #[error("object storage error")]
    Storage(#[from] object_store::Error),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("migration failed")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("malformed registry record")]
    Serialization(#[from] serde_json::Error),

    #[error("unreadable registry record at {path}")]
    CorruptRecord {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

/// Creates a connection pool to the `PostgreSQL` database.
///
/// # Errors
///
/// Returns an error if the connection to the database fails.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Runs all pending migrations.
///
/// # Errors
///
/// Returns an error if running migrations fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
