mod common;

use config::{DEMAND_FORECAST, InferenceMode};
use database::{ArtifactUri, read_artifact};
use demand_forecast::ErrorKind;
use demand_forecast::pipeline::run_training_job;
use ml_model::GradientBoostedRegressor;

use common::{curated_rows, memory_context, put_curated};

#[tokio::test]
async fn test_training_job_uploads_and_registers_artifact() {
    let ctx = memory_context(InferenceMode::Remote).await;
    put_curated(&ctx, "sales_fact/sale_date=2024-02-01/part-00000.jsonl", curated_rows()).await;

    let model_id = run_training_job(&ctx).await.unwrap();

    let latest = ctx.registry.latest_model(DEMAND_FORECAST).await.unwrap().unwrap();
    assert_eq!(latest.model_id, model_id);
    assert_eq!(latest.artifact_uri, "memory://merlin-test-curated/models/test/demand_forecast/model.json");
    assert_eq!(latest.metrics.len(), 1);
    let r2 = latest.metrics["r2"];
    assert!(r2.is_finite() && r2 <= 1.0);

    let uri = ArtifactUri::parse(&latest.artifact_uri).unwrap();
    let bytes = read_artifact(&ctx.stores, &uri).await.unwrap();
    let model = GradientBoostedRegressor::from_bytes(&bytes).unwrap();
    assert!(model.feature_names().iter().any(|name| name == "lag_days"));
}

#[tokio::test]
async fn test_retraining_registers_a_new_model() {
    let ctx = memory_context(InferenceMode::Remote).await;
    put_curated(&ctx, "sales_fact/part.jsonl", curated_rows()).await;

    let first = run_training_job(&ctx).await.unwrap();
    let second = run_training_job(&ctx).await.unwrap();

    assert_ne!(first, second);
    let latest = ctx.registry.latest_model(DEMAND_FORECAST).await.unwrap().unwrap();
    assert!([first, second].contains(&latest.model_id));
}

#[tokio::test]
async fn test_training_without_curated_data_is_not_found() {
    let ctx = memory_context(InferenceMode::Remote).await;

    let err = run_training_job(&ctx).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(ctx.registry.latest_model(DEMAND_FORECAST).await.unwrap().is_none());
}

#[tokio::test]
async fn test_training_with_one_row_fails_without_registering() {
    let ctx = memory_context(InferenceMode::Remote).await;
    let one_row = curated_rows().lines().next().unwrap().to_string();
    put_curated(&ctx, "sales_fact/part.jsonl", one_row).await;

    let err = run_training_job(&ctx).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Model);
    assert!(ctx.registry.latest_model(DEMAND_FORECAST).await.unwrap().is_none());
}
