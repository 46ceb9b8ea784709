//! Report assembly
//!
//! Merges the analyzer outputs into one versioned, timestamped report. No
//! analysis happens here; the recommendations are fixed text.

use crate::error::ComputeError;
use crate::types::{
    AnalysisReport, AnalysisSummary, Insight, MoodForecast, MoodPatterns, NormalizedDataset,
    ReportProducer, ReportStatus, Segmentation,
};
use crate::{MOOD_VERSION, PRODUCER_NAME};
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Static recommendations attached to every report
pub const RECOMMENDATIONS: [&str; 4] = [
    "Introduce relaxation techniques on the lowest-mood days",
    "Monitor users in the high-risk cluster",
    "Tailor interventions to each cluster",
    "Track sleep quality as a predictor of stress",
];

/// Assembler for report artifacts
pub struct ReportAssembler {
    instance_id: String,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportAssembler {
    /// Create a new assembler with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an assembler with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Build a complete report from the analyzer outputs
    pub fn assemble(
        &self,
        dataset: &NormalizedDataset,
        patterns: MoodPatterns,
        segmentation: Segmentation,
        predictions: MoodForecast,
        insights: Vec<Insight>,
    ) -> AnalysisReport {
        let summary = AnalysisSummary {
            total_users: dataset.subjects.len(),
            total_records: dataset.records.len(),
            mood_patterns: patterns,
            user_clusters: segmentation.clusters,
            user_segments: segmentation.users,
            predictions,
            insights,
        };
        self.report(ReportStatus::Complete, None, Some(summary))
    }

    /// Build an empty-result report for a run that had nothing to analyze
    pub fn insufficient(&self, reason: impl Into<String>) -> AnalysisReport {
        self.report(ReportStatus::InsufficientData, Some(reason.into()), None)
    }

    /// Serialize a report to compact JSON
    pub fn to_json(report: &AnalysisReport) -> Result<String, ComputeError> {
        serde_json::to_string(report).map_err(ComputeError::JsonError)
    }

    /// Serialize a report to indented JSON
    pub fn to_json_pretty(report: &AnalysisReport) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(report).map_err(ComputeError::JsonError)
    }

    fn report(
        &self,
        status: ReportStatus,
        reason: Option<String>,
        summary: Option<AnalysisSummary>,
    ) -> AnalysisReport {
        AnalysisReport {
            report_version: REPORT_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: MOOD_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            status,
            reason,
            summary,
            recommendations: RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
        }
    }
}
