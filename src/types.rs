//! Core types for the Synheart Mood pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: roster users, normalized emotional records, the derived pattern,
//! segmentation, forecast and insight outputs, and the final report payload.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ForecastScope;

/// The four bounded self-reported scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Mood,
    Stress,
    Energy,
    Sleep,
}

impl Metric {
    /// All metrics in column order
    pub const ALL: [Metric; 4] = [Metric::Mood, Metric::Stress, Metric::Energy, Metric::Sleep];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Mood => "mood",
            Metric::Stress => "stress",
            Metric::Energy => "energy",
            Metric::Sleep => "sleep",
        }
    }
}

/// Lowest valid score
pub const SCORE_MIN: f64 = 1.0;

/// Highest valid score
pub const SCORE_MAX: f64 = 10.0;

/// Roster role. Only subjects participate in analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "paciente", alias = "patient")]
    Subject,
    #[serde(alias = "psicologo", alias = "psychologist")]
    Clinician,
    Admin,
    /// Any role outside the known vocabulary
    #[serde(untagged)]
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Subject => "subject",
            Role::Clinician => "clinician",
            Role::Admin => "admin",
            Role::Other(name) => name.as_str(),
        }
    }

    pub fn is_subject(&self) -> bool {
        matches!(self, Role::Subject)
    }
}

/// A roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier
    pub id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
}

/// A day-granular wellbeing measurement in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning subject
    pub user_id: String,
    /// Calendar day of the measurement
    pub date: NaiveDate,
    /// Mood score (1-10)
    pub mood: Option<f64>,
    /// Stress score (1-10)
    pub stress: Option<f64>,
    /// Energy score (1-10)
    pub energy: Option<f64>,
    /// Sleep quality score (1-10)
    pub sleep: Option<f64>,
    /// Free-vocabulary emotion tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EmotionalRecord {
    /// Score for a metric, if present
    pub fn score(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Mood => self.mood,
            Metric::Stress => self.stress,
            Metric::Energy => self.energy,
            Metric::Sleep => self.sleep,
        }
    }
}

/// Output of the record normalizer: the immutable input shared by every analyzer
#[derive(Debug, Clone, Default)]
pub struct NormalizedDataset {
    /// Subjects from the roster (deduplicated by id, roster order)
    pub subjects: Vec<User>,
    /// Records owned by known subjects, ordered by date
    pub records: Vec<EmotionalRecord>,
}

impl NormalizedDataset {
    /// True when either the subject set or the record set is empty
    pub fn is_insufficient(&self) -> bool {
        self.subjects.is_empty() || self.records.is_empty()
    }

    /// All values of one metric, skipping missing entries
    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.score(metric)).collect()
    }

    /// Records owned by one subject, in date order
    pub fn records_for<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a EmotionalRecord> {
        self.records.iter().filter(move |r| r.user_id == user_id)
    }
}

/// Locale-invariant English weekday name
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ============================================================================
// Temporal patterns
// ============================================================================

/// Mean and sample standard deviation of one metric within a bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: Option<f64>,
    /// Null when the bucket holds fewer than two values
    pub std: Option<f64>,
}

/// Per-weekday aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStats {
    pub mood: MeanStd,
    pub stress: MeanStd,
    pub energy: MeanStd,
    pub records: usize,
}

/// Per-ISO-week aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekStats {
    pub mood: Option<f64>,
    pub stress: Option<f64>,
    pub energy: Option<f64>,
    pub sleep: Option<f64>,
    pub records: usize,
}

/// Occurrence count of one emotion tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Symmetric Pearson matrix keyed by metric
pub type CorrelationMatrix = BTreeMap<Metric, BTreeMap<Metric, Option<f64>>>;

/// Temporal pattern summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodPatterns {
    /// Keyed by English weekday name
    pub by_weekday: BTreeMap<String, WeekdayStats>,
    /// Keyed by ISO-8601 week number
    pub by_week: BTreeMap<u32, WeekStats>,
    pub correlations: CorrelationMatrix,
    pub emotion_frequencies: Vec<TagCount>,
}

// ============================================================================
// Segmentation
// ============================================================================

/// Longitudinal per-user statistics used as the clustering feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMetricVector {
    pub mood_mean: f64,
    pub mood_std: f64,
    pub stress_mean: f64,
    pub stress_std: f64,
    pub energy_mean: f64,
    pub energy_std: f64,
    pub sleep_mean: f64,
    pub sleep_std: f64,
}

impl UserMetricVector {
    /// Number of clustering features
    pub const LEN: usize = 8;

    /// Feature row in column order
    pub fn features(&self) -> Vec<f64> {
        vec![
            self.mood_mean,
            self.mood_std,
            self.stress_mean,
            self.stress_std,
            self.energy_mean,
            self.energy_std,
            self.sleep_mean,
            self.sleep_std,
        ]
    }
}

/// One subject's row in the segmentation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSegment {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    pub record_count: usize,
    #[serde(flatten)]
    pub metrics: UserMetricVector,
    /// Most-recent consecutive records with mood >= 7
    pub wellbeing_streak: u32,
    pub weekly_trend: WeeklyTrend,
    pub cluster: usize,
}

/// Direction of the week-over-week mood change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Worsening,
}

/// Mean mood of the last seven days against the seven days before,
/// both measured back from the dataset's last observed date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTrend {
    /// Rounded percent change; null when the previous week has no mood
    pub progress_pct: Option<i64>,
    pub direction: Option<TrendDirection>,
}

/// Aggregate over a cluster's members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub size: usize,
    pub avg_mood: f64,
    pub avg_stress: f64,
    pub description: String,
}

/// Segmentation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub users: Vec<UserSegment>,
    /// Keyed `Cluster_<n>`
    pub clusters: BTreeMap<String, ClusterSummary>,
}

// ============================================================================
// Forecast
// ============================================================================

/// Coarse heuristic confidence label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
}

/// One forward-looking prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Day offset from the last observed date (1-based)
    pub day: u32,
    pub predicted_mood: f64,
    pub confidence: Confidence,
}

/// How the forecast values were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastBasis {
    /// Fitted regression model
    Model,
    /// Too few distinct dates to fit a trend; historical mean repeated
    HistoricalMean,
}

/// Forecast for a single subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserForecast {
    pub basis: ForecastBasis,
    pub points: Vec<ForecastPoint>,
}

/// Forecaster output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodForecast {
    pub scope: ForecastScope,
    pub basis: ForecastBasis,
    /// Pooled forecast over all subjects
    pub points: Vec<ForecastPoint>,
    /// Per-subject forecasts, present when scope is per_user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_user: Option<BTreeMap<String, UserForecast>>,
}

// ============================================================================
// Insights
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Alert,
    Insight,
    Pattern,
}

/// Ordered high to low
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A human-readable finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

// ============================================================================
// Report
// ============================================================================

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    InsufficientData,
}

/// Fully populated analysis sections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_users: usize,
    pub total_records: usize,
    pub mood_patterns: MoodPatterns,
    pub user_clusters: BTreeMap<String, ClusterSummary>,
    pub user_segments: Vec<UserSegment>,
    pub predictions: MoodForecast,
    pub insights: Vec<Insight>,
}

/// Complete report artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub generated_at: String,
    pub producer: ReportProducer,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Null on insufficient data
    pub summary: Option<AnalysisSummary>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_aliases() {
        let role: Role = serde_json::from_str("\"paciente\"").unwrap();
        assert_eq!(role, Role::Subject);
        let role: Role = serde_json::from_str("\"psicologo\"").unwrap();
        assert_eq!(role, Role::Clinician);
        let role: Role = serde_json::from_str("\"nurse\"").unwrap();
        assert_eq!(role, Role::Other("nurse".to_string()));
        assert!(!role.is_subject());
    }

    #[test]
    fn test_metric_map_keys_serialize_lowercase() {
        let mut map = BTreeMap::new();
        map.insert(Metric::Stress, 1);
        map.insert(Metric::Mood, 2);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"mood":2,"stress":1}"#);
    }

    #[test]
    fn test_priority_ordering() {
        let mut priorities = vec![Priority::Low, Priority::High, Priority::Medium];
        priorities.sort();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn test_weekday_names() {
        assert_eq!(weekday_name(Weekday::Mon), "Monday");
        assert_eq!(weekday_name(Weekday::Sun), "Sunday");
    }
}
