//! Z-score standardization

use crate::error::ComputeError;
use crate::model::validate_matrix;
use serde::{Deserialize, Serialize};

/// Fits per-column mean and population standard deviation
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

/// Fitted column statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    pub means: Vec<f64>,
    /// Population std per column; 1.0 for zero-variance columns
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit column statistics
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<FittedScaler, ComputeError> {
        let width = validate_matrix(data)?;
        let n = data.len() as f64;

        let mut means = vec![0.0; width];
        for row in data {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut scales = vec![0.0; width];
        for row in data {
            for (j, v) in row.iter().enumerate() {
                scales[j] += (v - means[j]).powi(2);
            }
        }
        for s in scales.iter_mut() {
            let std = (*s / n).sqrt();
            *s = if std > f64::EPSILON { std } else { 1.0 };
        }

        Ok(FittedScaler { means, scales })
    }
}

impl FittedScaler {
    /// Standardize one row
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Standardize every row
    pub fn transform(&self, data: &[Vec<f64>]) -> Vec<Vec<f64>> {
        data.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_mean_unit_variance() {
        let data = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let scaler = StandardScaler.fit(&data).unwrap();
        let scaled = scaler.transform(&data);

        for j in 0..2 {
            let col: Vec<f64> = scaled.iter().map(|r| r[j]).collect();
            let mean = col.iter().sum::<f64>() / 3.0;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let data = vec![vec![5.0, 1.0], vec![5.0, 2.0]];
        let scaler = StandardScaler.fit(&data).unwrap();
        assert_eq!(scaler.scales[0], 1.0);
        let scaled = scaler.transform(&data);
        assert_eq!(scaled[0][0], 0.0);
        assert_eq!(scaled[1][0], 0.0);
    }

    #[test]
    fn test_fit_rejects_empty_and_ragged() {
        assert!(matches!(
            StandardScaler.fit(&[]),
            Err(ComputeError::InsufficientData(_))
        ));
        assert!(StandardScaler.fit(&[vec![1.0, 2.0], vec![1.0]]).is_err());
    }
}
