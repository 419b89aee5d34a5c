//! Core types for the keyward bridge library
//!
//! This module defines the fundamental value types shared by the action
//! builders, the table snapshot helpers and the callback machinery.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Timestamp type used throughout the bridge
pub type Timestamp = DateTime<Utc>;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Row identifier assigned by the spreadsheet host
pub type RowId = i64;

/// A single record: column id -> cell value
///
/// Backed by an insertion-ordered JSON map, so the order in which columns
/// were written is the order in which they are serialized.
pub type Record = Map<String, Value>;

/// Name of the column the host reserves for row ids
pub const ID_COLUMN: &str = "id";

/// Errors that can occur while talking to the host or loading data
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to load table data: {0}")]
    DataLoad(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Host request failed: {0}")]
    Host(String),

    #[error("Failed to subscribe to {0} events: {1}")]
    Subscription(String, String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Extract the row id of a record, if it carries an integer `id`
pub fn record_id(record: &Record) -> Option<RowId> {
    record.get(ID_COLUMN).and_then(Value::as_i64)
}

/// Column types understood by the host
///
/// Only the names matter on the wire; no type checking happens here.
pub mod column_type {
    pub const TEXT: &str = "Text";
    pub const NUMERIC: &str = "Numeric";
    pub const BOOL: &str = "Bool";
    pub const DATE: &str = "Date";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id() {
        let record: Record = serde_json::from_value(json!({"id": 7, "Name": "x"})).unwrap();
        assert_eq!(record_id(&record), Some(7));

        let no_id: Record = serde_json::from_value(json!({"Name": "x"})).unwrap();
        assert_eq!(record_id(&no_id), None);

        let null_id: Record = serde_json::from_value(json!({"id": null})).unwrap();
        assert_eq!(record_id(&null_id), None);
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::Subscription("records-changed".into(), "closed".into());
        assert_eq!(err.to_string(), "Failed to subscribe to records-changed events: closed");
    }
}
