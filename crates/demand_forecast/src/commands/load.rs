//! Load command - uploads local sample files to the landing bucket.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use sales_structs::parse_sales_payload;
use tracing::info;

use crate::AppContext;

/// Prefix of uploaded sample payloads inside the landing bucket.
pub const LANDING_DEMO_PREFIX: &str = "landing/demo";

/// Finds all `.json` files directly inside `dir`, sorted by name.
fn find_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Validates and uploads every JSON file in `dir` to `store`.
///
/// Nothing is uploaded if any file fails validation.
///
/// # Errors
///
/// Returns an error naming the file and record that failed validation, or
/// the upload that failed.
pub async fn upload_dir(store: &dyn ObjectStore, dir: &Path) -> Result<Vec<ObjectStorePath>> {
    let mut staged = Vec::new();
    for path in find_json_files(dir)? {
        let body = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let records =
            parse_sales_payload(&body).with_context(|| format!("Invalid sales data in {}", path.display()))?;

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        info!(file = %path.display(), records = records.len(), "Validated sample file");
        staged.push((ObjectStorePath::from(format!("{LANDING_DEMO_PREFIX}/{name}")), body));
    }

    let mut uploaded = Vec::with_capacity(staged.len());
    for (key, body) in staged {
        store
            .put(&key, body.into())
            .await
            .with_context(|| format!("Failed to upload {key}"))?;
        info!(key = %key, "Uploaded to landing bucket");
        uploaded.push(key);
    }
    Ok(uploaded)
}

/// Runs the load command.
///
/// # Errors
///
/// Returns an error if validation or upload fails.
pub async fn run(ctx: &AppContext, dir: &Path) -> Result<()> {
    let settings = &ctx.settings;
    let store = ctx
        .stores
        .store(settings.storage_scheme, &settings.landing_bucket)
        .context("Failed to open landing bucket")?;

    let uploaded = upload_dir(store.as_ref(), dir).await?;
    info!(
        files = uploaded.len(),
        bucket = %settings.landing_bucket,
        "Sample data loaded"
    );
    Ok(())
}
