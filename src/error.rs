//! Error types for Synheart Mood

use thiserror::Error;

/// Errors that can occur during an analysis run
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input rows: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data for computation: {0}")]
    InsufficientData(String),
}

impl ComputeError {
    /// Whether this error belongs to the schema family (fatal input shape problems)
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            ComputeError::ParseError(_)
                | ComputeError::JsonError(_)
                | ComputeError::MissingColumn(_)
                | ComputeError::DateParseError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_family() {
        assert!(ComputeError::MissingColumn("mood".to_string()).is_schema_error());
        assert!(ComputeError::DateParseError("x".to_string()).is_schema_error());
        assert!(!ComputeError::InvalidConfig("x".to_string()).is_schema_error());
        assert!(!ComputeError::InsufficientData("x".to_string()).is_schema_error());
    }

    #[test]
    fn test_serialization_failures_are_json_errors() {
        let err: ComputeError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert!(matches!(err, ComputeError::JsonError(_)));
        assert!(err.to_string().starts_with("Invalid JSON"));
    }

    #[test]
    fn test_display() {
        let err = ComputeError::MissingColumn("fecha".to_string());
        assert_eq!(err.to_string(), "Missing required column: fecha");
    }
}
