//! Session record readers
//!
//! A reader turns a file on disk into the raw nested mapping of one
//! `SessionData` struct. The loader only depends on the `RecordReader` trait.

use crate::error::{RecordLocation, SessionError};
use crate::schema::RawRecord;
use serde_json::Value;
use std::path::Path;

/// Key some exports wrap the record in (`load(file).SessionData`)
pub const SESSION_DATA_KEY: &str = "SessionData";

/// Trait for session file readers
pub trait RecordReader {
    /// Read one session file into its raw record
    fn read(&self, path: &Path) -> Result<RawRecord, SessionError>;
}

/// Reader for JSON exports of a SessionData struct
///
/// Accepts the struct at the top level or wrapped as `{"SessionData": {...}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordReader;

impl JsonRecordReader {
    /// Parse an in-memory JSON export
    pub fn parse_str(&self, json: &str) -> Result<RawRecord, SessionError> {
        let value: Value = serde_json::from_str(json)?;
        unwrap_session_data(value)
    }
}

impl RecordReader for JsonRecordReader {
    fn read(&self, path: &Path) -> Result<RawRecord, SessionError> {
        let unreadable = |reason: String| SessionError::FileUnreadable {
            path: path.display().to_string(),
            reason,
        };

        let json = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let record = self.parse_str(&json).map_err(|e| unreadable(e.to_string()))?;
        log::debug!("read {} top-level fields from {}", record.len(), path.display());
        Ok(record)
    }
}

/// File-level siblings such as `__header__` are dropped once the struct is found.
fn unwrap_session_data(value: Value) -> Result<RawRecord, SessionError> {
    match value {
        Value::Object(mut map) => match map.remove(SESSION_DATA_KEY) {
            Some(Value::Object(inner)) => {
                if !map.is_empty() {
                    log::debug!(
                        "dropping {} file-level fields next to {}",
                        map.len(),
                        SESSION_DATA_KEY
                    );
                }
                Ok(inner)
            }
            Some(other) => {
                map.insert(SESSION_DATA_KEY.to_string(), other);
                Ok(map)
            }
            None => Ok(map),
        },
        _ => Err(SessionError::malformed(
            RecordLocation::session(SESSION_DATA_KEY),
            "session export must be a JSON object",
        )),
    }
}
