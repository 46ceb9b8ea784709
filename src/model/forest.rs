//! Random forest regression
//!
//! Bagged CART regression trees with variance-reduction splits. Every tree is
//! grown on a bootstrap sample drawn from one seeded RNG, and candidate
//! features are visited in an RNG-shuffled order so that equally good splits
//! are broken deterministically for a given seed.

use crate::config::ForecastConfig;
use crate::error::ComputeError;
use crate::model::validate_matrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Minimum reduction in squared error for a split to be accepted
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Forest configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestRegressor {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

/// Node of a fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Fitted regression tree stored as a flat node arena (root at index 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

/// Fitted forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    pub trees: Vec<RegressionTree>,
    pub n_features: usize,
}

/// Growth limits shared by every tree
#[derive(Debug, Clone, Copy)]
struct TreeParams {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

impl RandomForestRegressor {
    /// Forest with default growth settings
    pub fn new(n_trees: usize, seed: u64) -> Self {
        let defaults = ForecastConfig::default();
        Self {
            n_trees,
            max_depth: defaults.max_depth,
            min_samples_split: defaults.min_samples_split,
            min_samples_leaf: defaults.min_samples_leaf,
            seed,
        }
    }

    pub fn from_config(config: &ForecastConfig, seed: u64) -> Self {
        Self {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            seed,
        }
    }

    /// Fit the forest on feature rows `x` and targets `y`
    pub fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<RandomForestModel, ComputeError> {
        let n_features = validate_matrix(x)?;
        if x.len() != y.len() {
            return Err(ComputeError::InsufficientData(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ComputeError::InsufficientData(
                "targets contain non-finite values".to_string(),
            ));
        }
        if self.n_trees == 0 {
            return Err(ComputeError::InvalidConfig(
                "n_trees must be at least 1".to_string(),
            ));
        }

        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split.max(2),
            min_samples_leaf: self.min_samples_leaf.max(1),
        };
        let mut rng = StdRng::seed_from_u64(self.seed);
        let n = x.len();

        let trees = (0..self.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::grow(x, y, sample, params, &mut rng)
            })
            .collect();

        Ok(RandomForestModel { trees, n_features })
    }
}

impl RandomForestModel {
    /// Mean of the tree predictions
    pub fn predict(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        total / self.trees.len() as f64
    }
}

impl RegressionTree {
    fn grow(
        x: &[Vec<f64>],
        y: &[f64],
        sample: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        tree.build(x, y, sample, 0, params, rng);
        tree
    }

    /// Append the subtree for `indices` and return its node index
    fn build(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let node_idx = self.nodes.len();
        let value = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;
        self.nodes.push(TreeNode::Leaf { value });

        let depth_reached = params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || indices.len() < params.min_samples_split {
            return node_idx;
        }

        let Some(split) = best_split(x, y, &indices, params.min_samples_leaf, rng) else {
            return node_idx;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        let left = self.build(x, y, left_idx, depth + 1, params, rng);
        let right = self.build(x, y, right_idx, depth + 1, params, rng);
        self.nodes[node_idx] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }
}

struct Split {
    feature: usize,
    threshold: f64,
}

/// Exhaustive search for the split with the largest squared-error reduction
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    indices: &[usize],
    min_leaf: usize,
    rng: &mut StdRng,
) -> Option<Split> {
    let n = indices.len();
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_score = total_sum * total_sum / n as f64;

    // Pure node
    if total_sq - parent_score <= MIN_SPLIT_GAIN {
        return None;
    }

    let mut features: Vec<usize> = (0..x[0].len()).collect();
    features.shuffle(rng);

    let mut best: Option<(f64, Split)> = None;
    let mut order = indices.to_vec();

    for feature in features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        for pos in 0..n - 1 {
            left_sum += y[order[pos]];
            let left_n = pos + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let here = x[order[pos]][feature];
            let next = x[order[pos + 1]][feature];
            if here >= next {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let score = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64;
            if score - parent_score <= MIN_SPLIT_GAIN {
                continue;
            }
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                let mut threshold = here + (next - here) / 2.0;
                if threshold >= next {
                    threshold = here;
                }
                best = Some((score, Split { feature, threshold }));
            }
        }
    }

    best.map(|(_, split)| split)
}
