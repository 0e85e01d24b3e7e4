//! `PostgreSQL` registry backend over the `model_runs` table.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::{ModelMetadata, RecordField, RegistryError, RegistryStore};

const UNIQUE_VIOLATION: &str = "23505";

/// Registry records stored as rows of `model_runs`.
#[derive(Debug, Clone)]
pub struct PgRegistryStore {
    pool: PgPool,
}

impl PgRegistryStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistryStore for PgRegistryStore {
    async fn put(&self, record: &ModelMetadata) -> Result<(), RegistryError> {
        let result = sqlx::query(
            r"
            INSERT INTO model_runs (run_id, model_type, artifact_uri, metrics, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(record.model_id)
        .bind(&record.model_type)
        .bind(&record.artifact_uri)
        .bind(Json(&record.metrics))
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(RegistryError::AlreadyExists(record.model_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn scan_eq(&self, field: RecordField, value: &str) -> Result<Vec<ModelMetadata>, RegistryError> {
        // Column names come from a closed enum, never from input.
        let sql = format!(
            "SELECT run_id, model_type, artifact_uri, metrics, created_at \
             FROM model_runs WHERE {} = $1 ORDER BY run_id",
            field.column()
        );
        let records = sqlx::query_as::<_, ModelMetadata>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }
}
