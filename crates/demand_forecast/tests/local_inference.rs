mod common;

use bytes::Bytes;
use config::{DEMAND_FORECAST, InferenceMode};
use database::{ArtifactUri, write_artifact};
use demand_forecast::ErrorKind;
use demand_forecast::inference::{ForecastClient, Forecaster};
use demand_forecast::pipeline::run_training_job;
use feature_extractor::build_feature_frame;
use ml_model::{BoosterConfig, GradientBoostedRegressor, LAG_DAYS, TabularDataset};
use sales_structs::SalesRecord;
use serde_json::{Map, Value, json};

use common::{curated_rows, memory_context, put_curated};

#[tokio::test]
async fn test_local_mode_without_registered_model_fails_at_construction() {
    let ctx = memory_context(InferenceMode::Local).await;

    let err = ForecastClient::from_context(&ctx).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_local_mode_predicts_with_registered_model() {
    let ctx = memory_context(InferenceMode::Local).await;

    let mut data = TabularDataset::new(vec!["a".to_string(), "b".to_string()]);
    for i in 0..10 {
        let x = f64::from(i);
        data.push(vec![x, x * 2.0], x * 3.0).unwrap();
    }
    let config = BoosterConfig {
        n_estimators: 20,
        ..BoosterConfig::default()
    };
    let model = GradientBoostedRegressor::fit(&data, &config).unwrap();

    let uri = ArtifactUri::parse("memory://merlin-test-curated/models/test/demand_forecast/model.json").unwrap();
    write_artifact(&ctx.stores, &uri, Bytes::from(model.to_bytes().unwrap()))
        .await
        .unwrap();
    ctx.registry
        .register_model(&uri.to_string(), [("r2", 1.0)], DEMAND_FORECAST)
        .await
        .unwrap();

    let client = ForecastClient::from_context(&ctx).await.unwrap();
    assert_eq!(client.mode(), InferenceMode::Local);
    assert_eq!(client.target(), uri.to_string());

    let response = client.predict(&json!({"instances": [{"a": 1, "b": 2}]})).await.unwrap();
    let predictions = response["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 1);
    assert!(predictions[0].as_f64().unwrap().is_finite());

    let columns = client.predict(&json!({"instances": {"a": [1, 5], "b": [2, 10]}})).await.unwrap();
    assert_eq!(columns["predictions"].as_array().unwrap().len(), 2);
    assert_eq!(columns["predictions"][0], response["predictions"][0]);

    let err = client.predict(&json!({"rows": []})).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_trained_pipeline_model_serves_engineered_features() {
    let ctx = memory_context(InferenceMode::Local).await;
    put_curated(&ctx, "sales_fact/part.jsonl", curated_rows()).await;
    run_training_job(&ctx).await.unwrap();

    let client = ForecastClient::from_context(&ctx).await.unwrap();

    let records: Vec<SalesRecord> = curated_rows()
        .lines()
        .map(|line| {
            let mut row: Map<String, Value> = serde_json::from_str(line).unwrap();
            sales_structs::rename_curated_columns(&mut row);
            serde_json::from_value(Value::Object(row)).unwrap()
        })
        .collect();
    let frame = build_feature_frame(&records);
    let instances: Vec<Value> = frame
        .rows()
        .iter()
        .enumerate()
        .map(|(lag, row)| {
            let mut instance: Map<String, Value> = feature_extractor::FEATURE_NAMES
                .iter()
                .zip(row.numeric_features())
                .map(|(name, value)| ((*name).to_string(), json!(value)))
                .collect();
            instance.insert(LAG_DAYS.to_string(), json!(lag));
            Value::Object(instance)
        })
        .collect();

    let response = client.predict(&json!({ "instances": instances })).await.unwrap();

    assert_eq!(response["predictions"].as_array().unwrap().len(), records.len());
}
