use std::collections::HashMap;

use config::{InferenceMode, Settings, SettingsOverrides, StackOutputs};
use demand_forecast::AppContext;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStoreExt, PutPayload};

/// Context for env `test` with every bucket held in memory.
pub async fn memory_context(mode: InferenceMode) -> AppContext {
    let env: HashMap<String, String> = [
        ("MERLIN_ENV", "test"),
        ("MERLIN_STORAGE_SCHEME", "memory"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let overrides = SettingsOverrides {
        inference_mode: Some(mode),
        ..SettingsOverrides::default()
    };
    let settings = Settings::resolve(&overrides, &env, &StackOutputs::default()).unwrap();
    AppContext::connect(settings).await.unwrap()
}

/// Five curated rows for one SKU with units sold 10, 12, 9, 14, 11.
pub fn curated_rows() -> String {
    let units = [10, 12, 9, 14, 11];
    let inventory = [50, 48, 47, 45, 44];
    units
        .iter()
        .zip(inventory)
        .enumerate()
        .map(|(i, (u, inv))| {
            format!(
                r#"{{"seller_id":"seller-123","sku":"SKU-001","date":"2024-02-0{day}","units_sold":{u},"net_revenue_usd":{rev},"ad_spend_usd":{ad},"inventory_on_hand":{inv},"sale_date":"2024-02-01"}}"#,
                day = i + 1,
                rev = u * 20,
                ad = u * 2,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn put_curated(ctx: &AppContext, key: &str, body: String) {
    let store = ctx
        .stores
        .store(ctx.settings.storage_scheme, &ctx.settings.curated_bucket)
        .unwrap();
    store
        .put(&ObjectStorePath::from(key), PutPayload::from(body))
        .await
        .unwrap();
}
