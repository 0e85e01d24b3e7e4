//! Predict command - sends a payload through the configured forecast client.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::AppContext;
use crate::inference::{ForecastClient, Forecaster};

/// Reads a JSON payload from `path`, or from stdin when no path is given.
fn read_payload(path: Option<&Path>) -> Result<Value> {
    let raw = match path {
        Some(path) => std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read payload from stdin")?;
            buf
        }
    };
    serde_json::from_slice(&raw).context("Payload is not valid JSON")
}

/// Runs the predict command and prints the response.
///
/// # Errors
///
/// Returns an error if the payload cannot be read, the client cannot be
/// built, or the prediction fails.
pub async fn run(ctx: &AppContext, payload: Option<&Path>) -> Result<()> {
    let payload = read_payload(payload)?;

    let client = ForecastClient::from_context(ctx)
        .await
        .context("Failed to build forecast client")?;
    let response = client.predict(&payload).await.context("Prediction failed")?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
