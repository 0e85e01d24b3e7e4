//! Training entry points for the demand forecast model.

use std::fs;
use std::path::Path;

use feature_extractor::{FEATURE_NAMES, build_feature_frame};
use sales_structs::{SalesRecord, parse_sales_payload};
use tracing::info;

use crate::{BoosterConfig, GradientBoostedRegressor, LAG_DAYS, ModelError, TabularDataset, r2_score};

/// Output from training.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOutput {
    /// R² on the held-out validation rows.
    pub validation_score: f64,
    /// Number of rows the ensemble was fitted on.
    pub train_rows: usize,
    /// Number of held-out rows.
    pub validation_rows: usize,
}

/// Builds the feature matrix and `units_sold` targets from ordered records.
///
/// Columns are [`FEATURE_NAMES`] followed by [`LAG_DAYS`], the 0-based
/// position of each row in `records`.
pub fn build_training_dataset(records: &[SalesRecord]) -> Result<TabularDataset, ModelError> {
    let frame = build_feature_frame(records);

    let mut names: Vec<String> = FEATURE_NAMES.iter().map(ToString::to_string).collect();
    names.push(LAG_DAYS.to_string());
    let mut data = TabularDataset::new(names);

    for (lag, row) in frame.rows().iter().enumerate() {
        let mut features = row.numeric_features().to_vec();
        features.push(lag as f64);
        data.push(features, row.target())?;
    }
    Ok(data)
}

/// Reads a JSON array of sales records from `path`.
pub fn load_training_records(path: &Path) -> Result<Vec<SalesRecord>, ModelError> {
    let bytes = fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_sales_payload(&bytes)?)
}

/// Trains on the records at `input`, writes the artifact to `output` and
/// returns the validation R².
pub fn train(input: &Path, output: &Path) -> Result<f64, ModelError> {
    let records = load_training_records(input)?;
    let result = train_records(&records, output, &BoosterConfig::default())?;
    Ok(result.validation_score)
}

/// Trains on in-memory records with an explicit configuration.
pub fn train_records(
    records: &[SalesRecord],
    output: &Path,
    config: &BoosterConfig,
) -> Result<TrainingOutput, ModelError> {
    let data = build_training_dataset(records)?;
    let (train_set, valid_set) = data.split(config.validation_percent, config.seed)?;

    info!(
        train_rows = train_set.len(),
        validation_rows = valid_set.len(),
        "Training demand forecast model"
    );

    let model = GradientBoostedRegressor::fit(&train_set, config)?;
    let predictions = model.predict_rows(valid_set.features());
    let validation_score = r2_score(valid_set.targets(), &predictions);

    info!("Validation R^2: {validation_score:.4}");

    model.save(output)?;
    info!(path = %output.display(), "Saved model artifact");

    Ok(TrainingOutput {
        validation_score,
        train_rows: train_set.len(),
        validation_rows: valid_set.len(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn records(units: &[u32]) -> Vec<SalesRecord> {
        units
            .iter()
            .enumerate()
            .map(|(i, &u)| SalesRecord {
                seller_id: "demo-seller".to_string(),
                sku: "SKU-001".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, u32::try_from(i).unwrap() + 1).unwrap(),
                units_sold: u,
                net_revenue: f64::from(u) * 20.0,
                ad_spend: Some(15.0 + i as f64),
                inventory_on_hand: Some(50),
            })
            .collect()
    }

    #[test]
    fn test_lag_days_count_up_from_zero() {
        let data = build_training_dataset(&records(&[3, 4, 5, 6])).unwrap();
        let lag_col = data.feature_names().iter().position(|n| n == LAG_DAYS).unwrap();
        let lags: Vec<f64> = data.features().iter().map(|row| row[lag_col]).collect();
        assert_eq!(lags, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_target_is_not_a_feature() {
        let data = build_training_dataset(&records(&[3, 4])).unwrap();
        assert!(!data.feature_names().iter().any(|n| n == "units_sold"));
        assert_eq!(data.targets(), [3.0, 4.0]);
    }

    #[test]
    fn test_train_five_rows_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sales.json");
        let output = dir.path().join("model.json");
        fs::write(&input, serde_json::to_vec(&records(&[10, 12, 9, 14, 11])).unwrap()).unwrap();

        let score = train(&input, &output).unwrap();

        assert!(score.is_finite());
        assert!(score <= 1.0);
        let model = GradientBoostedRegressor::load(&output).unwrap();
        assert_eq!(model.feature_names().len(), FEATURE_NAMES.len() + 1);
    }

    #[test]
    fn test_training_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let data = records(&[10, 12, 9, 14, 11, 13, 8, 15, 10, 12]);
        let config = BoosterConfig {
            n_estimators: 20,
            ..BoosterConfig::default()
        };

        let first = train_records(&data, &dir.path().join("a.json"), &config).unwrap();
        let second = train_records(&data, &dir.path().join("b.json"), &config).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.validation_rows, 2);
        assert_eq!(
            fs::read(dir.path().join("a.json")).unwrap(),
            fs::read(dir.path().join("b.json")).unwrap()
        );
    }

    #[test]
    fn test_single_row_is_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let err = train_records(&records(&[10]), &dir.path().join("m.json"), &BoosterConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { rows: 1, .. }));
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = train(&dir.path().join("absent.json"), &dir.path().join("m.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
