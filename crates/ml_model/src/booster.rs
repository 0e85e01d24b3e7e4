//! Gradient-boosted regression ensemble and its JSON artifact format.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::shuffle_indices;
use crate::tree::{RegressionTree, TreeParams};
use crate::{BoosterConfig, ModelError, TabularDataset};

/// Artifact format written by this version of the crate.
const FORMAT_VERSION: u32 = 1;

/// Squared-error gradient boosting over [`RegressionTree`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    format_version: u32,
    feature_names: Vec<String>,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    /// Fits the ensemble on `data`.
    ///
    /// Each round fits a tree to the current residuals on a seeded row
    /// subsample, so the same data and config always produce the same model.
    pub fn fit(data: &TabularDataset, config: &BoosterConfig) -> Result<Self, ModelError> {
        if data.is_empty() {
            return Err(ModelError::InsufficientData { rows: 0, needed: 1 });
        }

        let features = data.features();
        let targets = data.targets();
        let n = data.len();

        let base_score = targets.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut residuals = vec![0.0; n];

        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "subsample is in (0, 1]"
        )]
        let sample_size = ((n as f64 * config.subsample).round() as usize).clamp(1, n);

        let params = TreeParams {
            max_depth: config.max_depth,
            lambda: config.lambda,
        };

        let mut trees = Vec::with_capacity(config.n_estimators);
        let mut indices: Vec<usize> = (0..n).collect();

        for round in 0..config.n_estimators {
            for ((residual, target), prediction) in residuals.iter_mut().zip(targets).zip(&predictions) {
                *residual = target - prediction;
            }

            indices.sort_unstable();
            shuffle_indices(&mut indices, config.seed.wrapping_add(round as u64));
            let sample = &indices[..sample_size];

            let tree = RegressionTree::fit(features, &residuals, sample, params);
            for (prediction, row) in predictions.iter_mut().zip(features) {
                *prediction += config.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        debug!(trees = trees.len(), rows = n, "Fitted boosted ensemble");

        Ok(Self {
            format_version: FORMAT_VERSION,
            feature_names: data.feature_names().to_vec(),
            base_score,
            learning_rate: config.learning_rate,
            trees,
        })
    }

    /// Columns the model expects, in input order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Predicts a single row laid out in [`Self::feature_names`] order.
    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score
            + self.learning_rate * self.trees.iter().map(|tree| tree.predict(row)).sum::<f64>()
    }

    /// Predicts every row, preserving order.
    #[must_use]
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Reads an artifact, rejecting unknown format versions and broken trees.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_slice(bytes)?;
        if model.format_version != FORMAT_VERSION {
            return Err(ModelError::UnknownFormat(model.format_version));
        }
        if !model.trees.iter().all(RegressionTree::is_well_formed) {
            return Err(ModelError::Artifact(serde::de::Error::custom("tree references a missing node")));
        }
        Ok(model)
    }

    /// Writes the artifact to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads an artifact previously written by [`Self::save`].
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_dataset(rows: usize) -> TabularDataset {
        let mut data = TabularDataset::new(vec!["x".to_string(), "noise".to_string()]);
        for i in 0..rows {
            let x = i as f64;
            data.push(vec![x, (i % 3) as f64], 3.0 * x + 1.0).unwrap();
        }
        data
    }

    fn small_config() -> BoosterConfig {
        BoosterConfig {
            n_estimators: 50,
            ..BoosterConfig::default()
        }
    }

    #[test]
    fn test_fit_reduces_training_error() {
        let data = linear_dataset(40);
        let model = GradientBoostedRegressor::fit(&data, &small_config()).unwrap();

        let predictions = model.predict_rows(data.features());
        let mean = data.targets().iter().sum::<f64>() / data.len() as f64;
        let model_sse: f64 = predictions
            .iter()
            .zip(data.targets())
            .map(|(p, t)| (p - t).powi(2))
            .sum();
        let baseline_sse: f64 = data.targets().iter().map(|t| (t - mean).powi(2)).sum();

        assert_eq!(model.n_trees(), 50);
        assert!(model_sse < baseline_sse * 0.1);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = linear_dataset(25);
        let first = GradientBoostedRegressor::fit(&data, &small_config()).unwrap();
        let second = GradientBoostedRegressor::fit(&data, &small_config()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_row_predicts_its_target() {
        let mut data = TabularDataset::new(vec!["x".to_string()]);
        data.push(vec![1.0], 7.0).unwrap();
        let model = GradientBoostedRegressor::fit(&data, &small_config()).unwrap();
        assert!((model.predict_row(&[1.0]) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let data = TabularDataset::new(vec!["x".to_string()]);
        assert!(matches!(
            GradientBoostedRegressor::fit(&data, &small_config()),
            Err(ModelError::InsufficientData { rows: 0, .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = GradientBoostedRegressor::fit(&linear_dataset(10), &small_config()).unwrap();

        model.save(&path).unwrap();
        let loaded = GradientBoostedRegressor::load(&path).unwrap();

        assert_eq!(loaded.feature_names(), ["x", "noise"]);
        assert_eq!(loaded.predict_row(&[4.0, 1.0]), model.predict_row(&[4.0, 1.0]));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let model = GradientBoostedRegressor::fit(&linear_dataset(4), &small_config()).unwrap();
        let mut value = serde_json::to_value(&model).unwrap();
        value["format_version"] = serde_json::json!(99);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            GradientBoostedRegressor::from_bytes(&bytes),
            Err(ModelError::UnknownFormat(99))
        ));
    }

    #[test]
    fn test_garbage_artifact_is_rejected() {
        assert!(matches!(
            GradientBoostedRegressor::from_bytes(b"not a model"),
            Err(ModelError::Artifact(_))
        ));
    }
}
