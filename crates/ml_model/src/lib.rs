//! ML model crate for demand forecast prediction.
//!
//! This crate fits a gradient-boosted regression tree ensemble on tabular
//! features, scores it on a held-out split, and persists it as a JSON
//! artifact that can be loaded back for inference.

use std::path::PathBuf;

mod booster;
mod dataset;
mod metrics;
mod training;
mod tree;

pub use booster::GradientBoostedRegressor;
pub use dataset::{TabularDataset, shuffle_indices};
pub use metrics::r2_score;
pub use training::{TrainingOutput, build_training_dataset, load_training_records, train, train_records};
pub use tree::{Node, RegressionTree, TreeParams};

/// Column appended by the trainer holding each row's position in the sequence.
pub const LAG_DAYS: &str = "lag_days";

/// Errors raised while training, loading or running a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("need at least {needed} rows to train, got {rows}")]
    InsufficientData { rows: usize, needed: usize },

    #[error("row {row} has {got} features, expected {expected}")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("unsupported artifact format version {0}")]
    UnknownFormat(u32),

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact")]
    Artifact(#[from] serde_json::Error),

    #[error("invalid training data")]
    Dataset(#[from] sales_structs::ValidationError),
}

/// Hyperparameters of the boosted ensemble.
///
/// The defaults are the tuned production values; callers normally leave
/// them alone.
#[derive(Debug, Clone)]
pub struct BoosterConfig {
    /// Number of boosting rounds (trees).
    pub n_estimators: usize,
    /// Maximum depth of each tree.
    pub max_depth: usize,
    /// Shrinkage applied to every tree's output.
    pub learning_rate: f64,
    /// Fraction of training rows sampled for each tree.
    pub subsample: f64,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
    /// Seed for row sampling and the train/validation split.
    pub seed: u64,
    /// Percentage of rows held out for validation.
    pub validation_percent: usize,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            n_estimators: 250,
            max_depth: 6,
            learning_rate: 0.1,
            subsample: 0.8,
            lambda: 1.0,
            seed: 42,
            validation_percent: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booster_config_default() {
        let config = BoosterConfig::default();
        assert_eq!(config.n_estimators, 250);
        assert_eq!(config.max_depth, 6);
        assert!(config.learning_rate > 0.0);
        assert!(config.subsample > 0.0 && config.subsample <= 1.0);
    }
}
