//! Loader configuration

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format of `Info.SessionDate + " " + Info.SessionStartTime_UTC`
pub const DEFAULT_START_TIME_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// Prefix of digital port events (`Port1In`, `Port1Out`, ...)
pub const DEFAULT_PORT_EVENT_PREFIX: &str = "Port";

/// What to do with top-level keys outside the fixed SessionData attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownAttributePolicy {
    /// Keep them in `SessionAttributes::extra`
    #[default]
    Collect,
    /// Fail the load with `MalformedRecord`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub start_time_format: String,
    pub unknown_attributes: UnknownAttributePolicy,
    pub port_event_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_time_format: DEFAULT_START_TIME_FORMAT.to_string(),
            unknown_attributes: UnknownAttributePolicy::default(),
            port_event_prefix: DEFAULT_PORT_EVENT_PREFIX.to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse a JSON config; missing keys fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SessionError> {
        let json = std::fs::read_to_string(path).map_err(|e| SessionError::FileUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&json)
    }
}
