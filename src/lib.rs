//! Synheart Mood - Batch analytics engine for self-reported wellbeing records
//!
//! Mood turns a roster of users and their daily mood, stress, energy and sleep
//! scores into a single report through a deterministic pipeline: row parsing →
//! normalization → {temporal patterns, user segmentation, mood forecast,
//! insights} → report assembly.
//!
//! ## Modules
//!
//! - **Analysis Pipeline**: `analyze`, `analyze_json` and the reusable `MoodAnalyzer`
//! - **Models**: Seeded standard scaler, k-means and random forest regressor

pub mod config;
pub mod error;
pub mod forecast;
pub mod insights;
pub mod model;
pub mod normalizer;
pub mod patterns;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod segmentation;
pub mod stats;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{AnalysisConfig, ForecastScope};
pub use error::ComputeError;
pub use pipeline::{analyze, analyze_json, MoodAnalyzer};

// Schema exports
pub use schema::{RawRecordRow, RawUserRow, RowAdapter, RowFormat, SCHEMA_VERSION};

// Report exports
pub use report::{ReportAssembler, REPORT_VERSION};
pub use types::{AnalysisReport, ReportStatus};

/// Mood version embedded in every report
pub const MOOD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "synheart-mood";
