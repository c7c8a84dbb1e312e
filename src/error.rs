//! Error types for bpod-session

use std::fmt;
use thiserror::Error;

/// Where in a raw record a shape violation was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLocation {
    /// A top-level SessionData field
    Session { field: String },
    /// A field inside one trial's States/Events
    Trial { trial: usize, field: String },
}

impl RecordLocation {
    pub fn session(field: impl Into<String>) -> Self {
        RecordLocation::Session {
            field: field.into(),
        }
    }

    pub fn trial(trial: usize, field: impl Into<String>) -> Self {
        RecordLocation::Trial {
            trial,
            field: field.into(),
        }
    }
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordLocation::Session { field } => write!(f, "field '{}'", field),
            RecordLocation::Trial { trial, field } => {
                write!(f, "trial {} field '{}'", trial, field)
            }
        }
    }
}

/// Errors that can occur while loading or analysing a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot read session file {path}: {reason}")]
    FileUnreadable { path: String, reason: String },

    #[error("Malformed record at {location}: {reason}")]
    MalformedRecord {
        location: RecordLocation,
        reason: String,
    },

    #[error("Session metadata parse error: {0}")]
    MetadataParseError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    pub(crate) fn malformed(location: RecordLocation, reason: impl Into<String>) -> Self {
        SessionError::MalformedRecord {
            location,
            reason: reason.into(),
        }
    }
}
