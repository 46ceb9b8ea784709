//! Parsing and column checks for raw roster and record rows

use crate::error::ComputeError;
use crate::schema::raw_row::{RawRecordRow, RawUserRow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Serialized layout of an input table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFormat {
    /// JSON array of row objects
    Json,
    /// Newline-delimited JSON, one row object per line
    #[default]
    Ndjson,
}

/// Required record columns, each of which must be populated in at least one row
pub const REQUIRED_RECORD_COLUMNS: [&str; 6] =
    ["user_id", "date", "mood", "stress", "energy", "sleep"];

/// Adapter for turning serialized tables into typed rows
pub struct RowAdapter;

impl RowAdapter {
    /// Parse a JSON string containing an array of rows
    pub fn parse_array<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, ComputeError> {
        let rows: Vec<T> = serde_json::from_str(json)?;
        Ok(rows)
    }

    /// Parse NDJSON (newline-delimited JSON) rows
    pub fn parse_ndjson<T: DeserializeOwned>(ndjson: &str) -> Result<Vec<T>, ComputeError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(trimmed) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(rows)
    }

    /// Parse rows in the given layout
    pub fn parse<T: DeserializeOwned>(input: &str, format: RowFormat) -> Result<Vec<T>, ComputeError> {
        match format {
            RowFormat::Json => Self::parse_array(input),
            RowFormat::Ndjson => Self::parse_ndjson(input),
        }
    }

    /// Check that every required record column is populated somewhere.
    ///
    /// An empty table passes; emptiness is an insufficient-data condition,
    /// not a schema error.
    pub fn check_record_columns(rows: &[RawRecordRow]) -> Result<(), ComputeError> {
        if rows.is_empty() {
            return Ok(());
        }

        let missing = REQUIRED_RECORD_COLUMNS
            .iter()
            .find(|column| !rows.iter().any(|row| has_column(row, column)));

        match missing {
            Some(column) => Err(ComputeError::MissingColumn(column.to_string())),
            None => Ok(()),
        }
    }

    /// Check that roster rows carry ids and roles
    pub fn check_user_columns(rows: &[RawUserRow]) -> Result<(), ComputeError> {
        if rows.is_empty() {
            return Ok(());
        }
        if !rows.iter().any(|r| r.id.is_some()) {
            return Err(ComputeError::MissingColumn("id".to_string()));
        }
        if !rows.iter().any(|r| r.role.is_some()) {
            return Err(ComputeError::MissingColumn("role".to_string()));
        }
        Ok(())
    }
}

/// Whether a row populates the named record column; unknown names never match
fn has_column(row: &RawRecordRow, column: &str) -> bool {
    match column {
        "user_id" => row.user_id.is_some(),
        "date" => row.date.is_some(),
        "mood" => row.mood.is_some(),
        "stress" => row.stress.is_some(),
        "energy" => row.energy.is_some(),
        "sleep" => row.sleep.is_some(),
        _ => false,
    }
}
