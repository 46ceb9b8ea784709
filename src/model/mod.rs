//! Fitted-model primitives
//!
//! Each model is split into a configuration value with a pure `fit` function
//! and a fitted value with a side-effect free `predict`/`transform`. Nothing
//! here keeps state between runs.
//!
//! - `scaler`: z-score standardization
//! - `kmeans`: seeded k-means++ clustering
//! - `forest`: seeded random forest regression

pub mod forest;
pub mod kmeans;
pub mod scaler;

pub use forest::{RandomForestModel, RandomForestRegressor, RegressionTree, TreeNode};
pub use kmeans::{KMeans, KMeansModel};
pub use scaler::{FittedScaler, StandardScaler};

use crate::error::ComputeError;

/// Check that a feature matrix is non-empty, rectangular and finite
pub(crate) fn validate_matrix(data: &[Vec<f64>]) -> Result<usize, ComputeError> {
    let Some(first) = data.first() else {
        return Err(ComputeError::InsufficientData(
            "cannot fit a model on zero rows".to_string(),
        ));
    };
    let width = first.len();
    if width == 0 {
        return Err(ComputeError::InsufficientData(
            "cannot fit a model on zero features".to_string(),
        ));
    }
    for (idx, row) in data.iter().enumerate() {
        if row.len() != width {
            return Err(ComputeError::InsufficientData(format!(
                "row {} has {} features, expected {}",
                idx,
                row.len(),
                width
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ComputeError::InsufficientData(format!(
                "row {} contains a non-finite feature",
                idx
            )));
        }
    }
    Ok(width)
}

/// Squared euclidean distance
pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
