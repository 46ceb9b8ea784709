//! Record normalization
//!
//! This module turns raw roster and record rows into the canonical dataset:
//! - Roster filtered to subjects
//! - Dates parsed into calendar days (a bad date column aborts the run)
//! - Emotion tags parsed from arrays or serialized lists
//! - Scores sanitized to the [1, 10] range
//! - Records of unknown users dropped

use crate::error::ComputeError;
use crate::schema::{RawRecordRow, RawUserRow, RowAdapter};
use crate::types::{EmotionalRecord, NormalizedDataset, Role, User, SCORE_MAX, SCORE_MIN};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// Bookkeeping of what normalization kept, dropped and repaired
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationStats {
    pub user_rows: usize,
    pub subjects: usize,
    pub record_rows: usize,
    pub records_kept: usize,
    pub dropped_unknown_user: usize,
    pub dropped_missing_date: usize,
    pub tag_fallbacks: usize,
    pub clamped_scores: usize,
}

/// Normalized dataset plus the bookkeeping that produced it
#[derive(Debug, Clone)]
pub struct NormalizationOutcome {
    pub dataset: NormalizedDataset,
    pub stats: NormalizationStats,
}

/// Normalizer for converting raw rows into the canonical dataset
pub struct Normalizer;

impl Normalizer {
    /// Normalize raw roster and record rows
    pub fn normalize(
        users: &[RawUserRow],
        records: &[RawRecordRow],
    ) -> Result<NormalizationOutcome, ComputeError> {
        RowAdapter::check_user_columns(users)?;
        RowAdapter::check_record_columns(records)?;

        let mut stats = NormalizationStats {
            user_rows: users.len(),
            record_rows: records.len(),
            ..Default::default()
        };

        let subjects = collect_subjects(users);
        stats.subjects = subjects.len();
        let subject_ids: HashSet<&str> = subjects.iter().map(|u| u.id.as_str()).collect();

        // The date column is converted as a whole before any filtering
        let dates = parse_date_column(records)?;

        let mut normalized = Vec::with_capacity(records.len());
        for (row, date) in records.iter().zip(dates) {
            let Some(date) = date else {
                stats.dropped_missing_date += 1;
                continue;
            };

            let known = row
                .user_id
                .as_deref()
                .is_some_and(|id| subject_ids.contains(id));
            if !known {
                stats.dropped_unknown_user += 1;
                continue;
            }

            let (tags, fallback) = normalize_tags(row.tags.as_ref());
            if fallback {
                stats.tag_fallbacks += 1;
                warn!(record_id = ?row.id, "unparseable emotion tags, using empty set");
            }

            let mut clamp = |value: Option<f64>, name: &str| {
                let (value, clamped) = sanitize_score(value);
                if clamped {
                    stats.clamped_scores += 1;
                    warn!(record_id = ?row.id, metric = name, "score outside [1, 10], clamped");
                }
                value
            };

            let record = EmotionalRecord {
                id: row.id.clone(),
                user_id: row.user_id.clone().unwrap_or_default(),
                date,
                mood: clamp(row.mood, "mood"),
                stress: clamp(row.stress, "stress"),
                energy: clamp(row.energy, "energy"),
                sleep: clamp(row.sleep, "sleep"),
                tags,
                note: row.note.clone().filter(|n| !n.trim().is_empty()),
            };
            normalized.push(record);
        }

        normalized.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.user_id.cmp(&b.user_id)));
        stats.records_kept = normalized.len();

        if stats.dropped_missing_date > 0 {
            warn!(count = stats.dropped_missing_date, "records without a date dropped");
        }
        debug!(
            subjects = stats.subjects,
            kept = stats.records_kept,
            dropped_unknown_user = stats.dropped_unknown_user,
            "normalized records"
        );

        Ok(NormalizationOutcome {
            dataset: NormalizedDataset {
                subjects,
                records: normalized,
            },
            stats,
        })
    }
}

/// Subjects in roster order, deduplicated by id
fn collect_subjects(users: &[RawUserRow]) -> Vec<User> {
    let mut seen = HashSet::new();
    users
        .iter()
        .filter(|u| u.role.as_ref().is_some_and(|r| r.is_subject()))
        .filter_map(|u| {
            let id = u.id.clone()?;
            if !seen.insert(id.clone()) {
                return None;
            }
            Some(User {
                id,
                role: Role::Subject,
                profession: u.profession.clone(),
            })
        })
        .collect()
}

/// Parse every date in the column; any unparseable value fails the run
fn parse_date_column(records: &[RawRecordRow]) -> Result<Vec<Option<NaiveDate>>, ComputeError> {
    records
        .iter()
        .enumerate()
        .map(|(idx, row)| match row.date.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_date(raw).map(Some).ok_or_else(|| {
                ComputeError::DateParseError(format!(
                    "date column is not parseable (row {}: {:?})",
                    idx, raw
                ))
            }),
        })
        .collect()
}

/// Parse a serialized calendar date or timestamp into a calendar day
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y/%m/%d").ok()
}

/// Normalize the tag field. The flag is set when a present value had to be
/// discarded.
pub fn normalize_tags(value: Option<&Value>) -> (BTreeSet<String>, bool) {
    match value {
        None | Some(Value::Null) => (BTreeSet::new(), false),
        Some(Value::Array(items)) => tags_from_array(items),
        Some(Value::String(s)) => tags_from_string(s),
        Some(_) => (BTreeSet::new(), true),
    }
}

fn tags_from_array(items: &[Value]) -> (BTreeSet<String>, bool) {
    let mut tags = BTreeSet::new();
    let mut fallback = false;
    for item in items {
        match item {
            Value::String(s) => {
                let tag = s.trim();
                if !tag.is_empty() {
                    tags.insert(tag.to_string());
                }
            }
            _ => fallback = true,
        }
    }
    (tags, fallback)
}

fn tags_from_string(raw: &str) -> (BTreeSet<String>, bool) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (BTreeSet::new(), false);
    }

    // Serialized JSON list
    if trimmed.starts_with('[') {
        return match serde_json::from_str::<Vec<Value>>(trimmed) {
            Ok(items) => tags_from_array(&items),
            Err(_) => (BTreeSet::new(), true),
        };
    }

    // Postgres array literal: {a,b,"c d"}
    if let Some(inner) = trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        let tags = inner
            .split(',')
            .map(|t| t.trim().trim_matches('"').trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        return (tags, false);
    }

    (BTreeSet::new(), true)
}

/// Drop non-finite scores and clamp the rest into range
fn sanitize_score(value: Option<f64>) -> (Option<f64>, bool) {
    match value {
        None => (None, false),
        Some(v) if !v.is_finite() => (None, false),
        Some(v) if !(SCORE_MIN..=SCORE_MAX).contains(&v) => {
            (Some(v.clamp(SCORE_MIN, SCORE_MAX)), true)
        }
        Some(v) => (Some(v), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roster() -> Vec<RawUserRow> {
        vec![
            RawUserRow::subject("u1"),
            RawUserRow::subject("u2"),
            RawUserRow::new("doc", Role::Clinician),
            RawUserRow::subject("u1"),
        ]
    }

    #[test]
    fn test_filters_to_subjects() {
        let records = vec![
            RawRecordRow::new("u1", "2024-01-02", 6.0, 4.0, 5.0, 7.0),
            RawRecordRow::new("doc", "2024-01-02", 6.0, 4.0, 5.0, 7.0),
            RawRecordRow::new("ghost", "2024-01-02", 6.0, 4.0, 5.0, 7.0),
            RawRecordRow::new("u2", "2024-01-01", 8.0, 2.0, 7.0, 8.0),
        ];
        let outcome = Normalizer::normalize(&roster(), &records).unwrap();

        assert_eq!(outcome.dataset.subjects.len(), 2);
        assert_eq!(outcome.dataset.records.len(), 2);
        assert_eq!(outcome.stats.dropped_unknown_user, 2);
        // Sorted by date
        assert_eq!(outcome.dataset.records[0].user_id, "u2");
        assert_eq!(
            outcome.dataset.records[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_bad_date_fails_whole_run() {
        let records = vec![
            RawRecordRow::new("u1", "2024-01-02", 6.0, 4.0, 5.0, 7.0),
            RawRecordRow::new("ghost", "yesterday", 6.0, 4.0, 5.0, 7.0),
        ];
        let result = Normalizer::normalize(&roster(), &records);
        assert!(matches!(result, Err(ComputeError::DateParseError(_))));
    }

    #[test]
    fn test_null_date_drops_row() {
        let mut undated = RawRecordRow::new("u1", "", 6.0, 4.0, 5.0, 7.0);
        undated.date = None;
        let records = vec![
            RawRecordRow::new("u1", "2024-01-02", 6.0, 4.0, 5.0, 7.0),
            undated,
        ];
        let outcome = Normalizer::normalize(&roster(), &records).unwrap();
        assert_eq!(outcome.dataset.records.len(), 1);
        assert_eq!(outcome.stats.dropped_missing_date, 1);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09"), Some(expected));
        assert_eq!(parse_date("2024-03-09T22:15:00Z"), Some(expected));
        assert_eq!(parse_date("2024-03-09T22:15:00.123+02:00"), Some(expected));
        assert_eq!(parse_date("2024-03-09 08:00:00"), Some(expected));
        assert_eq!(parse_date("09/03/2024"), None);
    }

    #[test]
    fn test_tag_shapes() {
        let (tags, fallback) = normalize_tags(Some(&serde_json::json!(["feliz", "calmado"])));
        assert_eq!(tags.len(), 2);
        assert!(!fallback);

        let (tags, fallback) = normalize_tags(Some(&Value::from("[\"ansioso\"]")));
        assert!(tags.contains("ansioso"));
        assert!(!fallback);

        let (tags, fallback) = normalize_tags(Some(&Value::from("{cansado,\"muy feliz\"}")));
        assert!(tags.contains("cansado"));
        assert!(tags.contains("muy feliz"));
        assert!(!fallback);

        let (tags, fallback) = normalize_tags(Some(&Value::from("[broken")));
        assert!(tags.is_empty());
        assert!(fallback);

        let (tags, fallback) = normalize_tags(Some(&serde_json::json!(42)));
        assert!(tags.is_empty());
        assert!(fallback);

        let (tags, fallback) = normalize_tags(None);
        assert!(tags.is_empty());
        assert!(!fallback);
    }

    #[test]
    fn test_tag_fallback_never_fails() {
        let mut row = RawRecordRow::new("u1", "2024-01-02", 6.0, 4.0, 5.0, 7.0);
        row.tags = Some(serde_json::json!({"not": "a list"}));
        let outcome = Normalizer::normalize(&roster(), &[row]).unwrap();
        assert_eq!(outcome.stats.tag_fallbacks, 1);
        assert!(outcome.dataset.records[0].tags.is_empty());
    }

    #[test]
    fn test_out_of_range_scores_clamped() {
        let row = RawRecordRow::new("u1", "2024-01-02", 11.0, 0.0, 5.0, 7.0);
        let outcome = Normalizer::normalize(&roster(), &[row]).unwrap();
        let record = &outcome.dataset.records[0];
        assert_eq!(record.mood, Some(10.0));
        assert_eq!(record.stress, Some(1.0));
        assert_eq!(outcome.stats.clamped_scores, 2);
    }

    #[test]
    fn test_empty_inputs_are_not_errors() {
        let outcome = Normalizer::normalize(&[], &[]).unwrap();
        assert!(outcome.dataset.is_insufficient());
    }
}
