//! Generate command - writes synthetic seller sales data.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sales_structs::SalesRecord;
use tracing::info;

/// SKUs covered by the synthetic data set.
pub const SKUS: [&str; 3] = ["SKU-001", "SKU-002", "SKU-003"];

/// Seller id used for every synthetic record.
pub const SELLER_ID: &str = "demo-seller";

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Generates `days` records per SKU, counting back from `today`.
///
/// Units follow a random walk that never drops below one.
pub fn generate_records<R: Rng>(rng: &mut R, days: u32, today: NaiveDate) -> Vec<SalesRecord> {
    let mut records = Vec::with_capacity(SKUS.len() * days as usize);

    for sku in SKUS {
        let mut units: i64 = rng.gen_range(5..=20);
        for offset in 0..days {
            units = (units + rng.gen_range(-3..=3)).max(1);
            let units_sold = u32::try_from(units).unwrap_or(1);

            records.push(SalesRecord {
                seller_id: SELLER_ID.to_string(),
                sku: sku.to_string(),
                date: today - Duration::days(i64::from(offset)),
                units_sold,
                net_revenue: cents(f64::from(units_sold) * rng.gen_range(15.0..25.0)),
                ad_spend: Some(cents(rng.gen_range(15.0..30.0))),
                inventory_on_hand: Some(rng.gen_range(20..=100)),
            });
        }
    }

    records
}

/// Runs the generate command.
///
/// # Errors
///
/// Returns an error if the output file cannot be written.
pub fn run(output: &Path, days: u32, seed: Option<u64>) -> Result<usize> {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let records = generate_records(&mut rng, days, Local::now().date_naive());

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(&records).context("Failed to encode records")?;
    std::fs::write(output, body).with_context(|| format!("Failed to write {}", output.display()))?;

    info!(records = records.len(), path = %output.display(), "Wrote synthetic sales data");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    #[test]
    fn test_generated_records_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        let records = generate_records(&mut rng, 30, today());

        assert_eq!(records.len(), 90);
        for record in &records {
            assert!(record.validate().is_ok());
            assert!(record.units_sold >= 1);
            assert!((20..=100).contains(&record.inventory_on_hand.unwrap()));
            let ad = record.ad_spend.unwrap();
            assert!((15.0..=30.0).contains(&ad));
            assert!((ad * 100.0 - (ad * 100.0).round()).abs() < 1e-6);
        }
        assert_eq!(records[0].date, today());
        assert_eq!(records[29].date, today() - Duration::days(29));
        assert_eq!(records[30].sku, "SKU-002");
    }

    #[test]
    fn test_seed_makes_output_reproducible() {
        let first = generate_records(&mut StdRng::seed_from_u64(1), 5, today());
        let second = generate_records(&mut StdRng::seed_from_u64(1), 5, today());
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_writes_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample").join("sales.json");

        let written = run(&path, 2, Some(3)).unwrap();

        let parsed = sales_structs::parse_sales_payload(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, 6);
        assert_eq!(parsed.len(), 6);
    }
}
