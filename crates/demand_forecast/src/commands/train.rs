//! Train command - runs the training job for the configured environment.

use anyhow::{Context, Result};
use tracing::info;

use crate::AppContext;
use crate::pipeline::run_training_job;

/// Runs the train command and prints the new model id.
///
/// # Errors
///
/// Returns an error if any phase of the training job fails.
pub async fn run(ctx: &AppContext) -> Result<()> {
    info!(env = %ctx.settings.env, "Starting training");

    let model_id = run_training_job(ctx).await.context("Training job failed")?;

    println!("{model_id}");
    Ok(())
}
