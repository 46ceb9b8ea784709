//! Raw input row schema
//!
//! This module defines the loosely typed roster and record rows supplied by
//! the external data source, and the adapter that parses them from JSON array
//! or NDJSON documents and checks the required columns.

mod adapter;
mod raw_row;

pub use adapter::*;
pub use raw_row::*;

/// Identifier of the input row schema
pub const SCHEMA_VERSION: &str = "mood.raw_rows.v1";
