//! Tabular dataset and deterministic train/validation splitting.

use crate::ModelError;

/// Feature matrix with named columns and one regression target per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularDataset {
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl TabularDataset {
    /// Creates an empty dataset with the given columns.
    #[must_use]
    pub const fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            features: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Appends a row. Non-finite feature values are stored as `0.0`.
    pub fn push(&mut self, mut features: Vec<f64>, target: f64) -> Result<(), ModelError> {
        if features.len() != self.feature_names.len() {
            return Err(ModelError::ShapeMismatch {
                row: self.features.len(),
                expected: self.feature_names.len(),
                got: features.len(),
            });
        }
        for value in &mut features {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
        self.features.push(features);
        self.targets.push(target);
        Ok(())
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Returns the number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// Splits rows into `(train, validation)` sets.
    ///
    /// `ceil(n * validation_percent / 100)` rows are held out after a
    /// seeded shuffle, so identical input always yields the identical split.
    pub fn split(&self, validation_percent: usize, seed: u64) -> Result<(Self, Self), ModelError> {
        let rows = self.len();
        if rows < 2 {
            return Err(ModelError::InsufficientData { rows, needed: 2 });
        }

        let n_valid = (rows * validation_percent).div_ceil(100).clamp(1, rows - 1);

        let mut indices: Vec<usize> = (0..rows).collect();
        shuffle_indices(&mut indices, seed);
        let (valid_idx, train_idx) = indices.split_at(n_valid);

        Ok((self.select(train_idx), self.select(valid_idx)))
    }
}

/// Shuffles indices using a simple LCG-based shuffle.
pub fn shuffle_indices(indices: &mut [usize], seed: u64) {
    // Fisher-Yates shuffle with LCG random
    let mut rng_state = seed.wrapping_add(12345);

    for i in (1..indices.len()).rev() {
        // LCG: state = (a * state + c) mod m
        rng_state = rng_state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        #[expect(clippy::cast_possible_truncation, reason = "upper bits fit in usize")]
        let j = ((rng_state >> 33) as usize) % (i + 1);
        indices.swap(i, j);
    }
}
