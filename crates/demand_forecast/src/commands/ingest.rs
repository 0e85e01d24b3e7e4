//! Ingest command - validates one seller payload and stages it for curation.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use sales_structs::{ValidationError, parse_sales_payload};
use tracing::{error, info};
use uuid::Uuid;

use super::curate::LANDING_PREFIX;
use crate::{AppContext, ForecastError};

/// Validates `body` as a sales payload and writes the normalized records to
/// `landing/{seller_id}/{timestamp}-{request_id}.json`.
///
/// Returns the staged key. Nothing is written when validation fails.
pub async fn stage_payload(
    store: &dyn ObjectStore,
    seller_id: &str,
    body: &[u8],
) -> Result<ObjectStorePath, ForecastError> {
    if seller_id.trim().is_empty() || seller_id.contains('/') {
        return Err(ValidationError::Missing { field: "seller_id" }.into());
    }

    let records = parse_sales_payload(body).inspect_err(|e| {
        error!(seller_id, error = %e, "Rejected seller payload");
    })?;

    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let key = ObjectStorePath::from(format!(
        "{LANDING_PREFIX}/{seller_id}/{timestamp}-{}.json",
        Uuid::new_v4()
    ));
    let normalized = serde_json::to_vec(&records).map_err(|e| ForecastError::transient("failed to encode payload", e))?;
    store.put(&key, normalized.into()).await?;

    info!(seller_id, key = %key, records = records.len(), "Staged seller payload");
    Ok(key)
}

/// Runs the ingest command and prints the staged key.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the payload is invalid, or
/// the upload fails.
pub async fn run(ctx: &AppContext, seller_id: &str, file: &Path) -> Result<()> {
    let settings = &ctx.settings;
    let body = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let store = ctx
        .stores
        .store(settings.storage_scheme, &settings.landing_bucket)
        .context("Failed to open landing bucket")?;

    let key = stage_payload(store.as_ref(), seller_id, &body)
        .await
        .with_context(|| format!("Failed to ingest {}", file.display()))?;

    println!("{}/{key}", settings.landing_bucket);
    Ok(())
}
