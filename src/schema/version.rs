//! Producer generation detection

use super::raw_record::{RawRecord, TRIAL_END_KEY};
use serde::{Deserialize, Serialize};

/// Which producer generation wrote a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Gen2 producers write per-trial end offsets and a UTC session start
    Gen2,
    /// Older producers omit the end offsets
    Legacy,
}

impl SchemaVersion {
    /// Classify a raw record by the presence of the end-of-trial offsets field
    pub fn detect(raw: &RawRecord) -> Self {
        if raw.contains_key(TRIAL_END_KEY) {
            SchemaVersion::Gen2
        } else {
            SchemaVersion::Legacy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::Gen2 => "gen2",
            SchemaVersion::Legacy => "legacy",
        }
    }
}
