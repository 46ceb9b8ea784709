//! Per-run analysis configuration
//!
//! Every tunable of the pipeline lives here and is passed explicitly into each
//! stage. Models are fit fresh from this configuration on every run; nothing
//! is cached between runs.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Default RNG seed for clustering and forest bootstrapping
pub const DEFAULT_SEED: u64 = 42;

/// Default number of behavioral clusters
pub const DEFAULT_CLUSTERS: usize = 4;

/// Whether the forecaster fits one pooled model or one model per subject
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastScope {
    /// One model over every subject's records
    #[default]
    Pooled,
    /// Pooled model plus one model per subject
    PerUser,
}

/// K-means settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Requested cluster count (reduced when there are fewer distinct profiles)
    pub n_clusters: usize,
    /// Number of k-means++ restarts; the lowest-inertia run wins
    pub n_init: usize,
    /// Lloyd iterations per restart
    pub max_iter: usize,
    /// Convergence threshold on total centroid shift
    pub tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_clusters: DEFAULT_CLUSTERS,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

/// Random forest and forecast heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub scope: ForecastScope,
    pub n_trees: usize,
    /// Unlimited when absent
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// |prediction - historical mean| below this is labelled High
    pub confidence_threshold: f64,
    /// Distinct dates required before a trend model is fit
    pub min_forecast_dates: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            scope: ForecastScope::Pooled,
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            confidence_threshold: 1.0,
            min_forecast_dates: 2,
        }
    }
}

/// Complete configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub seed: u64,
    pub clustering: ClusteringConfig,
    pub forecast: ForecastConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            clustering: ClusteringConfig::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values no model can be fit with
    pub fn validate(&self) -> Result<(), ComputeError> {
        let c = &self.clustering;
        if c.n_clusters == 0 {
            return Err(ComputeError::InvalidConfig(
                "clustering.n_clusters must be at least 1".to_string(),
            ));
        }
        if c.n_init == 0 || c.max_iter == 0 {
            return Err(ComputeError::InvalidConfig(
                "clustering.n_init and clustering.max_iter must be at least 1".to_string(),
            ));
        }
        if !(c.tolerance.is_finite() && c.tolerance >= 0.0) {
            return Err(ComputeError::InvalidConfig(
                "clustering.tolerance must be a non-negative number".to_string(),
            ));
        }

        let f = &self.forecast;
        if f.n_trees == 0 {
            return Err(ComputeError::InvalidConfig(
                "forecast.n_trees must be at least 1".to_string(),
            ));
        }
        if f.min_samples_split < 2 {
            return Err(ComputeError::InvalidConfig(
                "forecast.min_samples_split must be at least 2".to_string(),
            ));
        }
        if f.min_samples_leaf == 0 {
            return Err(ComputeError::InvalidConfig(
                "forecast.min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if f.max_depth == Some(0) {
            return Err(ComputeError::InvalidConfig(
                "forecast.max_depth must be at least 1 when set".to_string(),
            ));
        }
        if !(f.confidence_threshold.is_finite() && f.confidence_threshold > 0.0) {
            return Err(ComputeError::InvalidConfig(
                "forecast.confidence_threshold must be positive".to_string(),
            ));
        }
        if f.min_forecast_dates == 0 {
            return Err(ComputeError::InvalidConfig(
                "forecast.min_forecast_dates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
