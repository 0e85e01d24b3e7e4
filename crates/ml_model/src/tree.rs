//! Regression trees grown greedily on boosting residuals.

use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
}

/// Node of a regression tree, stored in a flat vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Rows with `features[feature] < threshold` go left, the rest go right.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    gain: f64,
    feature: usize,
    threshold: f64,
}

impl RegressionTree {
    /// Fits a tree to `residuals` over the selected `rows` of `features`.
    ///
    /// Splits maximise the regularized squared-error gain; ties keep the
    /// first candidate found (lowest feature index, lowest threshold).
    #[must_use]
    pub fn fit(features: &[Vec<f64>], residuals: &[f64], rows: &[usize], params: TreeParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        if rows.is_empty() {
            tree.nodes.push(Node::Leaf { value: 0.0 });
        } else {
            tree.grow(features, residuals, rows.to_vec(), 0, params);
        }
        tree
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Output of the tree for one row. Missing columns read as `0.0`.
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value < *threshold { *left } else { *right };
                }
                Some(Node::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
    }

    /// Checks that every split points forward to an existing node.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(idx, node)| match node {
                Node::Split { left, right, .. } => {
                    *left > idx && *right > idx && *left < self.nodes.len() && *right < self.nodes.len()
                }
                Node::Leaf { value } => value.is_finite(),
            })
    }

    fn grow(
        &mut self,
        features: &[Vec<f64>],
        residuals: &[f64],
        rows: Vec<usize>,
        depth: usize,
        params: TreeParams,
    ) -> usize {
        let idx = self.nodes.len();
        let sum: f64 = rows.iter().map(|&r| residuals[r]).sum();
        let count = rows.len() as f64;
        self.nodes.push(Node::Leaf {
            value: sum / (count + params.lambda),
        });

        if depth >= params.max_depth || rows.len() < 2 {
            return idx;
        }
        let Some(best) = best_split(features, residuals, &rows, sum, params.lambda) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| features[r][best.feature] < best.threshold);

        let left = self.grow(features, residuals, left_rows, depth + 1, params);
        let right = self.grow(features, residuals, right_rows, depth + 1, params);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }
}

fn best_split(
    features: &[Vec<f64>],
    residuals: &[f64],
    rows: &[usize],
    total: f64,
    lambda: f64,
) -> Option<BestSplit> {
    let n = rows.len() as f64;
    let parent_score = total * total / (n + lambda);
    let n_features = features.get(rows[0]).map_or(0, Vec::len);

    let mut best: Option<BestSplit> = None;
    let mut sorted = rows.to_vec();

    for feature in 0..n_features {
        sorted.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut left_sum = 0.0;
        for i in 1..sorted.len() {
            left_sum += residuals[sorted[i - 1]];
            let lo = features[sorted[i - 1]][feature];
            let hi = features[sorted[i]][feature];
            if lo >= hi {
                continue;
            }

            let left_n = i as f64;
            let right_n = n - left_n;
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / (left_n + lambda)
                + right_sum * right_sum / (right_n + lambda)
                - parent_score;

            if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(BestSplit {
                    gain,
                    feature,
                    threshold: lo + (hi - lo) / 2.0,
                });
            }
        }
    }

    best
}
