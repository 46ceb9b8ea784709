//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Mood.
//! It orchestrates the full run from raw roster and record rows to the report.

use crate::config::AnalysisConfig;
use crate::error::ComputeError;
use crate::forecast::MoodForecaster;
use crate::insights::InsightGenerator;
use crate::normalizer::Normalizer;
use crate::patterns::PatternAnalyzer;
use crate::report::ReportAssembler;
use crate::schema::{RawRecordRow, RawUserRow, RowAdapter};
use crate::segmentation::SegmentationEngine;
use crate::types::{AnalysisReport, Metric, NormalizedDataset};
use tracing::{debug, info};

/// Analyze raw roster and record rows into a report.
///
/// # Arguments
/// * `users` - Roster rows; only subjects are analyzed
/// * `records` - Emotional record rows
/// * `config` - Seeds and model settings for this run
///
/// # Returns
/// A complete report, or an insufficient-data report when nothing is left to
/// analyze after normalization. Schema problems are errors.
///
/// # Example
/// ```ignore
/// let report = analyze(&users, &records, &AnalysisConfig::default())?;
/// ```
pub fn analyze(
    users: &[RawUserRow],
    records: &[RawRecordRow],
    config: &AnalysisConfig,
) -> Result<AnalysisReport, ComputeError> {
    run_pipeline(&ReportAssembler::new(), users, records, config)
}

/// Analyze JSON-array roster and record documents into a pretty JSON report.
///
/// # Example
/// ```ignore
/// let report_json = analyze_json(users_json, records_json, &AnalysisConfig::default())?;
/// ```
pub fn analyze_json(
    users_json: &str,
    records_json: &str,
    config: &AnalysisConfig,
) -> Result<String, ComputeError> {
    let users: Vec<RawUserRow> = RowAdapter::parse_array(users_json)?;
    let records: Vec<RawRecordRow> = RowAdapter::parse_array(records_json)?;
    let report = analyze(&users, &records, config)?;
    ReportAssembler::to_json_pretty(&report)
}

/// Run the full pipeline.
///
/// Pipeline stages:
/// 1. Normalizer - Filter subjects, parse dates and tags, sanitize scores
/// 2. PatternAnalyzer - Weekday, weekly and correlation summaries
/// 3. SegmentationEngine - Cluster subjects by wellbeing profile
/// 4. MoodForecaster - Seven-day mood forecast
/// 5. InsightGenerator - Ranked findings
/// 6. ReportAssembler - Versioned report
fn run_pipeline(
    assembler: &ReportAssembler,
    users: &[RawUserRow],
    records: &[RawRecordRow],
    config: &AnalysisConfig,
) -> Result<AnalysisReport, ComputeError> {
    config.validate()?;
    info!(
        user_rows = users.len(),
        record_rows = records.len(),
        seed = config.seed,
        "analysis started"
    );

    // Stage 1: Normalize
    let outcome = Normalizer::normalize(users, records)?;
    let dataset = outcome.dataset;

    if let Some(reason) = insufficiency(&dataset) {
        info!(reason, "insufficient data; returning empty report");
        return Ok(assembler.insufficient(reason));
    }

    // Stages 2-5 read the same immutable dataset
    let patterns = PatternAnalyzer::analyze(&dataset);
    debug!(weekdays = patterns.by_weekday.len(), weeks = patterns.by_week.len(), "patterns");

    let segmentation = SegmentationEngine::segment(&dataset, &config.clustering, config.seed)?;
    let predictions = MoodForecaster::forecast(&dataset, &config.forecast, config.seed)?;
    let insights = InsightGenerator::generate(&dataset);

    // Stage 6: Assemble
    let report = assembler.assemble(&dataset, patterns, segmentation, predictions, insights);
    info!(
        subjects = dataset.subjects.len(),
        records = dataset.records.len(),
        "analysis finished"
    );
    Ok(report)
}

/// Reason the dataset cannot be analyzed, if any
fn insufficiency(dataset: &NormalizedDataset) -> Option<&'static str> {
    if dataset.subjects.is_empty() {
        Some("no subjects in roster")
    } else if dataset.records.is_empty() {
        Some("no records for known subjects")
    } else if dataset.column(Metric::Mood).is_empty() {
        Some("no mood values recorded")
    } else {
        None
    }
}

/// Reusable analyzer holding a configuration and a stable producer identity.
///
/// Every run fits fresh models; only the instance id is shared across runs.
pub struct MoodAnalyzer {
    config: AnalysisConfig,
    assembler: ReportAssembler,
}

impl Default for MoodAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MoodAnalyzer {
    /// Create an analyzer with default settings
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            assembler: ReportAssembler::new(),
        }
    }

    /// Create an analyzer with a validated configuration
    pub fn with_config(config: AnalysisConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            assembler: ReportAssembler::new(),
        })
    }

    /// Load configuration from JSON
    pub fn load_config(&mut self, json: &str) -> Result<(), ComputeError> {
        self.config = AnalysisConfig::from_json(json)?;
        Ok(())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        self.assembler.instance_id()
    }

    /// Analyze parsed rows
    pub fn run(
        &self,
        users: &[RawUserRow],
        records: &[RawRecordRow],
    ) -> Result<AnalysisReport, ComputeError> {
        run_pipeline(&self.assembler, users, records, &self.config)
    }

    /// Analyze JSON-array documents into a pretty JSON report
    pub fn run_json(&self, users_json: &str, records_json: &str) -> Result<String, ComputeError> {
        let users: Vec<RawUserRow> = RowAdapter::parse_array(users_json)?;
        let records: Vec<RawRecordRow> = RowAdapter::parse_array(records_json)?;
        let report = self.run(&users, &records)?;
        ReportAssembler::to_json_pretty(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, ReportStatus, Role};
    use pretty_assertions::assert_eq;

    fn roster() -> Vec<RawUserRow> {
        vec![
            RawUserRow::subject("1"),
            RawUserRow::subject("2"),
            RawUserRow::subject("3"),
            RawUserRow::new("99", Role::Clinician),
        ]
    }

    /// Three subjects, ten days each, mood 8 and stress 2
    fn steady_records() -> Vec<RawRecordRow> {
        let mut rows = Vec::new();
        for user in ["1", "2", "3"] {
            for day in 1..=10 {
                let date = format!("2024-02-{day:02}");
                rows.push(RawRecordRow::new(user, date, 8.0, 2.0, 7.0, 7.0).with_tags(&["calm"]));
            }
        }
        rows
    }

    fn sample_users_json() -> &'static str {
        r#"[
            {"id": 1, "rol": "paciente", "profesion": "Engineer"},
            {"id": 2, "rol": "paciente", "profesion": "Teacher"},
            {"id": 3, "rol": "psicologo"}
        ]"#
    }

    fn sample_records_json() -> &'static str {
        r#"[
            {"user_id": 1, "fecha": "2024-01-01", "mood": 4, "stress": 8, "energy": 3, "sleep": 4, "emociones": "[\"ansioso\"]"},
            {"user_id": 1, "fecha": "2024-01-02", "mood": 5, "stress": 7, "energy": 4, "sleep": 5, "emociones": "{ansioso,cansado}"},
            {"user_id": 2, "fecha": "2024-01-01", "mood": 8, "stress": 3, "energy": 7, "sleep": 8, "emociones": ["feliz"]},
            {"user_id": 2, "fecha": "2024-01-03", "mood": 9, "stress": 2, "energy": 8, "sleep": 9},
            {"user_id": 3, "fecha": "2024-01-03", "mood": 1, "stress": 10, "energy": 1, "sleep": 1}
        ]"#
    }

    #[test]
    fn test_steady_population_end_to_end() {
        let report = analyze(&roster(), &steady_records(), &AnalysisConfig::default()).unwrap();
        assert_eq!(report.status, ReportStatus::Complete);
        let summary = report.summary.unwrap();

        assert_eq!(summary.total_users, 3);
        assert_eq!(summary.total_records, 30);
        assert_eq!(summary.user_segments.len(), 3);

        // Identical profiles collapse into one cluster
        assert_eq!(summary.user_clusters.len(), 1);
        let cluster = &summary.user_clusters["Cluster_0"];
        assert_eq!(cluster.size, 3);
        assert_eq!(cluster.description, "High Wellbeing");

        assert_eq!(summary.predictions.points.len(), 7);
        for point in &summary.predictions.points {
            assert_eq!(point.predicted_mood, 8.0);
            assert_eq!(point.confidence, Confidence::High);
        }

        // Only the weekday pattern fires
        assert_eq!(summary.insights.len(), 1);
        assert_eq!(summary.insights[0].title, "Lowest-Mood Weekday");

        assert_eq!(summary.mood_patterns.emotion_frequencies[0].count, 30);
        assert!(summary.user_segments.iter().all(|u| u.wellbeing_streak == 10));
        assert!(summary
            .user_segments
            .iter()
            .all(|u| u.weekly_trend.progress_pct == Some(0)));
    }

    #[test]
    fn test_repeated_runs_agree() {
        let config = AnalysisConfig::default();
        let a = analyze(&roster(), &steady_records(), &config).unwrap();
        let b = analyze(&roster(), &steady_records(), &config).unwrap();

        let a = serde_json::to_value(a.summary).unwrap();
        let b = serde_json::to_value(b.summary).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_roster_is_insufficient() {
        let report = analyze(&[], &steady_records(), &AnalysisConfig::default()).unwrap();
        assert_eq!(report.status, ReportStatus::InsufficientData);
        assert!(report.summary.is_none());
        assert_eq!(report.recommendations.len(), 4);
    }

    #[test]
    fn test_records_of_unknown_users_only_is_insufficient() {
        let records = vec![RawRecordRow::new("404", "2024-02-01", 5.0, 5.0, 5.0, 5.0)];
        let report = analyze(&roster(), &records, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.status, ReportStatus::InsufficientData);
        assert_eq!(report.reason.as_deref(), Some("no records for known subjects"));
    }

    #[test]
    fn test_bad_date_column_fails_run() {
        let mut records = steady_records();
        records[4].date = Some("not a date".to_string());
        let result = analyze(&roster(), &records, &AnalysisConfig::default());
        assert!(matches!(result, Err(ComputeError::DateParseError(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalysisConfig::default();
        config.forecast.n_trees = 0;
        let result = analyze(&roster(), &steady_records(), &config);
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));
    }

    #[test]
    fn test_analyze_json_source_vocabulary() {
        let json =
            analyze_json(sample_users_json(), sample_records_json(), &AnalysisConfig::default())
                .unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(report["status"], "complete");
        assert_eq!(report["producer"]["name"], "synheart-mood");
        let summary = &report["summary"];
        // User 3 is a clinician; their record is dropped
        assert_eq!(summary["total_users"], 2);
        assert_eq!(summary["total_records"], 4);
        assert_eq!(summary["predictions"]["points"].as_array().unwrap().len(), 7);
        assert_eq!(summary["mood_patterns"]["emotion_frequencies"][0]["tag"], "ansioso");
        assert_eq!(summary["mood_patterns"]["emotion_frequencies"][0]["count"], 2);
    }

    #[test]
    fn test_analyzer_keeps_instance_id() {
        let analyzer = MoodAnalyzer::new();
        let a = analyzer.run(&roster(), &steady_records()).unwrap();
        let b = analyzer.run(&roster(), &steady_records()).unwrap();
        assert_eq!(a.producer.instance_id, b.producer.instance_id);
        assert_eq!(a.producer.instance_id, analyzer.instance_id());
    }

    #[test]
    fn test_analyzer_loads_config() {
        let mut analyzer = MoodAnalyzer::new();
        analyzer
            .load_config(r#"{"forecast": {"scope": "per_user"}}"#)
            .unwrap();
        let json = analyzer
            .run_json(sample_users_json(), sample_records_json())
            .unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        let per_user = &report["summary"]["predictions"]["per_user"];
        assert!(per_user["1"].is_object());
        assert!(per_user["2"].is_object());
    }
}
