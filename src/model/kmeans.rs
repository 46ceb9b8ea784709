//! Seeded k-means clustering
//!
//! k-means++ seeding followed by Lloyd iterations, restarted `n_init` times
//! from one seeded RNG; the restart with the lowest inertia wins. The
//! effective cluster count never exceeds the number of distinct rows.

use crate::config::ClusteringConfig;
use crate::error::ComputeError;
use crate::model::{squared_distance, validate_matrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// K-means configuration
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Relative to the mean feature variance
    pub tolerance: f64,
    pub seed: u64,
}

/// Fitted centroids and training assignments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansModel {
    pub centroids: Vec<Vec<f64>>,
    /// Cluster of each training row
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeans {
    /// K-means with default iteration settings
    pub fn new(n_clusters: usize, seed: u64) -> Self {
        let defaults = ClusteringConfig::default();
        Self {
            n_clusters,
            n_init: defaults.n_init,
            max_iter: defaults.max_iter,
            tolerance: defaults.tolerance,
            seed,
        }
    }

    pub fn from_config(config: &ClusteringConfig, seed: u64) -> Self {
        Self {
            n_clusters: config.n_clusters,
            n_init: config.n_init,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
            seed,
        }
    }

    /// Cluster count actually used for `data`
    pub fn effective_clusters(&self, data: &[Vec<f64>]) -> usize {
        self.n_clusters.min(count_distinct(data))
    }

    /// Fit centroids on `data`
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<KMeansModel, ComputeError> {
        validate_matrix(data)?;
        if self.n_clusters == 0 {
            return Err(ComputeError::InvalidConfig(
                "n_clusters must be at least 1".to_string(),
            ));
        }

        let k = self.effective_clusters(data);
        let tol = self.tolerance * mean_variance(data);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best: Option<KMeansModel> = None;
        for _ in 0..self.n_init.max(1) {
            let seeds = kmeans_plus_plus(data, k, &mut rng);
            let model = lloyd(data, seeds, self.max_iter.max(1), tol);
            if best.as_ref().map_or(true, |b| model.inertia < b.inertia) {
                best = Some(model);
            }
        }

        best.ok_or_else(|| ComputeError::InsufficientData("k-means produced no run".to_string()))
    }
}

impl KMeansModel {
    /// Index of the nearest centroid (lowest index on ties)
    pub fn predict(&self, row: &[f64]) -> usize {
        nearest(&self.centroids, row).0
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }
}

fn count_distinct(data: &[Vec<f64>]) -> usize {
    let mut distinct: Vec<&Vec<f64>> = Vec::new();
    for row in data {
        if !distinct.contains(&row) {
            distinct.push(row);
        }
    }
    distinct.len()
}

fn mean_variance(data: &[Vec<f64>]) -> f64 {
    let n = data.len() as f64;
    let width = data[0].len();
    let total: f64 = (0..width)
        .map(|j| {
            let mean = data.iter().map(|r| r[j]).sum::<f64>() / n;
            data.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n
        })
        .sum();
    total / width as f64
}

fn nearest(centroids: &[Vec<f64>], row: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(centroid, row);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

/// D²-weighted seeding
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..data.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = data.iter().map(|row| nearest(&centroids, row).1).collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = data.len() - 1;
            for (idx, w) in weights.iter().enumerate() {
                acc += w;
                if acc >= target && *w > 0.0 {
                    chosen = idx;
                    break;
                }
            }
            if weights[chosen] > 0.0 {
                chosen
            } else {
                // Rounding pushed the pick past the last positive weight
                weights.iter().rposition(|w| *w > 0.0).unwrap_or(chosen)
            }
        } else {
            break;
        };
        centroids.push(data[next].clone());
    }

    centroids
}

fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> (Vec<usize>, f64) {
    let mut inertia = 0.0;
    let labels = data
        .iter()
        .map(|row| {
            let (idx, d) = nearest(centroids, row);
            inertia += d;
            idx
        })
        .collect();
    (labels, inertia)
}

fn lloyd(data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, max_iter: usize, tol: f64) -> KMeansModel {
    let k = centroids.len();
    let width = data[0].len();
    let mut iterations = 0;

    for _ in 0..max_iter {
        iterations += 1;
        let (labels, _) = assign(data, &centroids);

        let mut sums = vec![vec![0.0; width]; k];
        let mut counts = vec![0usize; k];
        for (row, &label) in data.iter().zip(&labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(row) {
                *s += v;
            }
        }

        let mut updated: Vec<Vec<f64>> = sums
            .into_iter()
            .zip(&counts)
            .enumerate()
            .map(|(idx, (sum, &count))| {
                if count == 0 {
                    centroids[idx].clone()
                } else {
                    sum.into_iter().map(|s| s / count as f64).collect()
                }
            })
            .collect();

        relocate_empty(data, &labels, &counts, &mut updated);

        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = updated;
        if shift <= tol {
            break;
        }
    }

    let (labels, inertia) = assign(data, &centroids);
    KMeansModel {
        centroids,
        labels,
        inertia,
        iterations,
    }
}

/// Move each empty centroid onto the row farthest from its assigned centroid
fn relocate_empty(data: &[Vec<f64>], labels: &[usize], counts: &[usize], centroids: &mut [Vec<f64>]) {
    let empty: Vec<usize> = (0..counts.len()).filter(|&c| counts[c] == 0).collect();
    if empty.is_empty() {
        return;
    }

    let mut distances: Vec<(usize, f64)> = Vec::new();
    for (idx, (row, &label)) in data.iter().zip(labels).enumerate() {
        // Never empty a cluster to fill another
        if counts[label] > 1 {
            distances.push((idx, squared_distance(row, &centroids[label])));
        }
    }
    distances.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    for (cluster, (row_idx, _)) in empty.into_iter().zip(distances) {
        centroids[cluster] = data[row_idx].clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, -0.1],
            vec![-0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 9.9],
            vec![9.9, 10.1],
        ]
    }

    #[test]
    fn test_separates_blobs() {
        let model = KMeans::new(2, 42).fit(&two_blobs()).unwrap();
        assert_eq!(model.n_clusters(), 2);
        assert_eq!(model.labels[0], model.labels[1]);
        assert_eq!(model.labels[0], model.labels[2]);
        assert_eq!(model.labels[3], model.labels[4]);
        assert_ne!(model.labels[0], model.labels[3]);
        assert!(model.inertia < 1.0);
    }

    #[test]
    fn test_predict_matches_training_labels() {
        let data = two_blobs();
        let model = KMeans::new(2, 42).fit(&data).unwrap();
        for (row, &label) in data.iter().zip(&model.labels) {
            assert_eq!(model.predict(row), label);
        }
        assert_eq!(model.predict(&[9.0, 9.0]), model.labels[3]);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let data = two_blobs();
        let a = KMeans::new(3, 7).fit(&data).unwrap();
        let b = KMeans::new(3, 7).fit(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_k_reduced_to_distinct_rows() {
        let data = vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![2.0, 2.0]];
        let model = KMeans::new(4, 42).fit(&data).unwrap();
        assert_eq!(model.n_clusters(), 2);
        assert_eq!(model.labels[0], model.labels[1]);
        assert_ne!(model.labels[0], model.labels[2]);
    }

    #[test]
    fn test_identical_rows_single_cluster() {
        let data = vec![vec![0.0; 8]; 3];
        let model = KMeans::new(4, 42).fit(&data).unwrap();
        assert_eq!(model.n_clusters(), 1);
        assert_eq!(model.labels, vec![0, 0, 0]);
        assert_eq!(model.inertia, 0.0);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            KMeans::new(4, 42).fit(&[]),
            Err(ComputeError::InsufficientData(_))
        ));
    }
}
