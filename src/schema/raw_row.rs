//! Raw roster and record rows as supplied by the external data source
//!
//! Rows arrive loosely typed: ids may be strings or numbers, dates are
//! serialized strings, and the tag column may hold an array or a serialized
//! list. Both the English column names and the source column names
//! (`rol`, `profesion`, `fecha`, `emociones`, `notas`) are accepted.

use crate::types::Role;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Row of the user roster table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUserRow {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(default, alias = "rol")]
    pub role: Option<Role>,
    #[serde(default, alias = "profesion")]
    pub profession: Option<String>,
}

impl RawUserRow {
    /// Roster row with the given id and role
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: Some(id.into()),
            role: Some(role),
            profession: None,
        }
    }

    /// Convenience constructor for a subject row
    pub fn subject(id: impl Into<String>) -> Self {
        Self::new(id, Role::Subject)
    }
}

/// Row of the emotional record table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecordRow {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub user_id: Option<String>,
    /// Serialized calendar date or timestamp
    #[serde(default, alias = "fecha")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_score")]
    pub mood: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_score")]
    pub stress: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_score")]
    pub energy: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_score")]
    pub sleep: Option<f64>,
    /// Array of strings or a serialized list; anything else is tolerated
    #[serde(default, alias = "emociones", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Value>,
    #[serde(default, alias = "notas", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RawRecordRow {
    /// Record row with all four scores present
    pub fn new(
        user_id: impl Into<String>,
        date: impl Into<String>,
        mood: f64,
        stress: f64,
        energy: f64,
        sleep: f64,
    ) -> Self {
        Self {
            id: None,
            user_id: Some(user_id.into()),
            date: Some(date.into()),
            mood: Some(mood),
            stress: Some(stress),
            energy: Some(energy),
            sleep: Some(sleep),
            tags: None,
            note: None,
        }
    }

    /// Attach a tag array
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = Some(Value::from(tags.to_vec()));
        self
    }
}

/// Accept string or numeric identifiers
fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "identifier must be a string or number, got {other}"
        ))),
    }
}

/// Accept numeric scores or numeric strings (DECIMAL columns)
fn deserialize_opt_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("score is not numeric: {s:?}"))),
        Some(other) => Err(D::Error::custom(format!(
            "score must be a number, got {other}"
        ))),
    }
}
