//! Offline training job: curated partitions in, registered model out.

use std::path::Path;

use bytes::Bytes;
use config::DEMAND_FORECAST;
use database::{ArtifactUri, write_artifact};
use futures::TryStreamExt;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use sales_structs::{SalesRecord, parse_curated_rows, record_from_row, rename_curated_columns};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{AppContext, ForecastError};

/// Prefix of curated sales partitions inside the curated bucket.
pub const CURATED_PREFIX: &str = "sales_fact";

/// `Some(true)` for newline-delimited partitions, `Some(false)` for JSON
/// arrays, `None` for keys that are not partitions.
fn partition_format(key: &str) -> Option<bool> {
    if key.ends_with(".jsonl") {
        Some(true)
    } else if key.ends_with(".json") {
        Some(false)
    } else {
        None
    }
}

/// Reads every curated partition under `prefix` into one record set.
///
/// Partitions are read in key order and their columns renamed to the
/// trainer's names. Fails with [`ForecastError::NotFound`] if there are none.
pub async fn gather_curated_records(
    store: &dyn ObjectStore,
    prefix: &str,
) -> Result<Vec<SalesRecord>, ForecastError> {
    let prefix_path = ObjectStorePath::from(prefix);
    let mut partitions: Vec<_> = store
        .list(Some(&prefix_path))
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .filter_map(|meta| partition_format(meta.location.as_ref()).map(|jsonl| (meta.location, jsonl)))
        .collect();

    if partitions.is_empty() {
        return Err(ForecastError::NotFound(format!(
            "no curated partitions (.json or .jsonl) under {prefix}/"
        )));
    }
    partitions.sort_by(|a, b| a.0.cmp(&b.0));

    let mut records = Vec::new();
    for (location, jsonl) in partitions {
        let bytes = store.get(&location).await?.bytes().await?;
        let rows = parse_curated_rows(&bytes, jsonl).map_err(|e| ForecastError::partition(location.to_string(), e))?;
        debug!(partition = %location, rows = rows.len(), "Read curated partition");

        for (index, mut row) in rows.into_iter().enumerate() {
            rename_curated_columns(&mut row);
            let record = record_from_row(index, row).map_err(|e| ForecastError::partition(location.to_string(), e))?;
            records.push(record);
        }
    }

    info!(rows = records.len(), "Gathered curated sales records");
    Ok(records)
}

/// Runs the full training job for the environment in `ctx.settings`.
///
/// Curated data is gathered, a model trained in a scratch directory, the
/// artifact uploaded to `{artifact_prefix}/model.json` and the model
/// registered with its validation R² as the only metric. Any failure aborts
/// the job; re-running it is the recovery path.
pub async fn run_training_job(ctx: &AppContext) -> Result<Uuid, ForecastError> {
    let settings = &ctx.settings;
    let curated = ctx.stores.store(settings.storage_scheme, &settings.curated_bucket)?;

    info!(env = %settings.env, bucket = %settings.curated_bucket, "Starting training job");
    let records = gather_curated_records(curated.as_ref(), CURATED_PREFIX).await?;

    let scratch = tempfile::tempdir().map_err(|e| ForecastError::transient("failed to create scratch directory", e))?;
    let (score, artifact) = train_in(scratch.path(), &records)?;

    let uri = ArtifactUri::new(
        settings.storage_scheme,
        &settings.curated_bucket,
        &format!("{}/model.json", settings.artifact_prefix()),
    );
    write_artifact(&ctx.stores, &uri, artifact).await?;
    info!(artifact_uri = %uri, "Uploaded model artifact");

    let model_id = ctx
        .registry
        .register_model(&uri.to_string(), [("r2", score)], DEMAND_FORECAST)
        .await?;

    info!(model_id = %model_id, artifact_uri = %uri, r2 = score, "Training complete");
    Ok(model_id)
}

/// Trains inside `dir` and returns the score and the artifact bytes.
fn train_in(dir: &Path, records: &[SalesRecord]) -> Result<(f64, Bytes), ForecastError> {
    let input = dir.join("training_data.json");
    let output = dir.join("demand_forecast.json");

    let body = serde_json::to_vec(records).map_err(|e| ForecastError::transient("failed to encode training data", e))?;
    std::fs::write(&input, body).map_err(|e| ForecastError::transient(format!("failed to write {}", input.display()), e))?;

    let score = ml_model::train(&input, &output)?;

    let artifact = std::fs::read(&output)
        .map_err(|e| ForecastError::transient(format!("failed to read {}", output.display()), e))?;
    Ok((score, Bytes::from(artifact)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use object_store::PutPayload;
    use object_store::memory::InMemory;

    use super::*;
    use crate::ErrorKind;

    const ROW_A: &str = r#"{"seller_id":"s","sku":"SKU-001","date":"2024-02-01","units_sold":10,"net_revenue_usd":200.0,"ad_spend_usd":20.0,"inventory_on_hand":50,"sale_date":"2024-02-01"}"#;
    const ROW_B: &str = r#"{"seller_id":"s","sku":"SKU-001","date":"2024-02-02","units_sold":12,"net_revenue_usd":240.0,"ad_spend_usd":24.0,"inventory_on_hand":48,"sale_date":"2024-02-02"}"#;

    async fn put(store: &InMemory, key: &str, body: String) {
        store
            .put(&ObjectStorePath::from(key), PutPayload::from(body))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_prefix_is_not_found() {
        let store = InMemory::new();
        let err = gather_curated_records(&store, CURATED_PREFIX).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_other_suffixes_are_ignored() {
        let store = InMemory::new();
        put(&store, "sales_fact/_SUCCESS", String::new()).await;
        put(&store, "sales_fact/part.parquet", "binary".to_string()).await;
        let err = gather_curated_records(&store, CURATED_PREFIX).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_partitions_are_combined_in_key_order() {
        let store = Arc::new(InMemory::new());
        put(&store, "sales_fact/sale_date=2024-02-02/part-00000.jsonl", format!("{ROW_B}\n")).await;
        put(&store, "sales_fact/sale_date=2024-02-01/part-00000.json", format!("[{ROW_A}]")).await;

        let records = gather_curated_records(store.as_ref(), CURATED_PREFIX).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].units_sold, 10);
        assert!((records[0].net_revenue - 200.0).abs() < f64::EPSILON);
        assert_eq!(records[1].ad_spend, Some(24.0));
    }

    #[tokio::test]
    async fn test_invalid_rows_fail_validation() {
        let store = InMemory::new();
        let bad = ROW_A.replace("200.0", "-1.0");
        put(&store, "sales_fact/part.jsonl", bad).await;
        let err = gather_curated_records(&store, CURATED_PREFIX).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_invalid_row_error_names_partition_and_row() {
        let store = InMemory::new();
        put(&store, "sales_fact/sale_date=2024-02-01/part-00000.jsonl", format!("{ROW_A}\n{ROW_A}\n")).await;
        let bad = ROW_B.replace("240.0", "-5.0");
        put(&store, "sales_fact/sale_date=2024-02-02/part-00000.jsonl", format!("{ROW_B}\n{bad}\n")).await;

        let err = gather_curated_records(&store, CURATED_PREFIX).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        let ForecastError::InvalidPartition { path, source } = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(path, "sales_fact/sale_date=2024-02-02/part-00000.jsonl");
        assert!(matches!(source, sales_structs::ValidationError::Record { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_malformed_partition_error_names_path() {
        let store = InMemory::new();
        put(&store, "sales_fact/x.json", "{bad".to_string()).await;

        let err = gather_curated_records(&store, CURATED_PREFIX).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("sales_fact/x.json"));
    }
}
