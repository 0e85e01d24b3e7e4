//! Curate command - normalizes landing payloads into dated partitions.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use futures::TryStreamExt;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use sales_structs::{CuratedRow, parse_curated_rows, record_from_row, to_curated_row, to_json_lines};
use tracing::{debug, info};

use crate::pipeline::CURATED_PREFIX;
use crate::{AppContext, ForecastError};

/// Prefix holding raw seller payloads in the landing bucket.
pub const LANDING_PREFIX: &str = "landing";

/// Reads every landing object, validates it and writes one newline-delimited
/// partition per sale date. Returns the partition keys written.
///
/// Existing partitions for the same date are replaced.
pub async fn curate(landing: &dyn ObjectStore, curated: &dyn ObjectStore) -> Result<Vec<ObjectStorePath>, ForecastError> {
    let mut objects: Vec<_> = landing
        .list(Some(&ObjectStorePath::from(LANDING_PREFIX)))
        .try_collect()
        .await?;
    objects.retain(|meta| {
        let key = meta.location.as_ref();
        key.ends_with(".json") || key.ends_with(".jsonl")
    });
    if objects.is_empty() {
        return Err(ForecastError::NotFound(format!("no landing payloads under {LANDING_PREFIX}/")));
    }
    objects.sort_by(|a, b| a.location.cmp(&b.location));

    let mut partitions: BTreeMap<String, Vec<CuratedRow>> = BTreeMap::new();
    for meta in objects {
        let bytes = landing.get(&meta.location).await?.bytes().await?;
        let rows = parse_curated_rows(&bytes, meta.location.as_ref().ends_with(".jsonl"))
            .map_err(|e| ForecastError::partition(meta.location.to_string(), e))?;
        debug!(object = %meta.location, rows = rows.len(), "Read landing payload");

        for (index, row) in rows.into_iter().enumerate() {
            let record = record_from_row(index, row).map_err(|e| ForecastError::partition(meta.location.to_string(), e))?;
            partitions
                .entry(record.date.format("%Y-%m-%d").to_string())
                .or_default()
                .push(to_curated_row(&record));
        }
    }

    let mut written = Vec::with_capacity(partitions.len());
    for (sale_date, rows) in partitions {
        let key = ObjectStorePath::from(format!("{CURATED_PREFIX}/sale_date={sale_date}/part-00000.jsonl"));
        let body = to_json_lines(&rows).map_err(|e| ForecastError::transient("failed to encode partition", e))?;
        curated.put(&key, body.into()).await?;
        debug!(partition = %key, rows = rows.len(), "Wrote curated partition");
        written.push(key);
    }
    Ok(written)
}

/// Runs the curate command.
///
/// # Errors
///
/// Returns an error if a payload is invalid or storage fails.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let settings = &ctx.settings;
    let landing = ctx
        .stores
        .store(settings.storage_scheme, &settings.landing_bucket)
        .context("Failed to open landing bucket")?;
    let curated = ctx
        .stores
        .store(settings.storage_scheme, &settings.curated_bucket)
        .context("Failed to open curated bucket")?;

    let written = curate(landing.as_ref(), curated.as_ref())
        .await
        .context("Curation failed")?;
    info!(partitions = written.len(), bucket = %settings.curated_bucket, "Curation complete");
    Ok(())
}
