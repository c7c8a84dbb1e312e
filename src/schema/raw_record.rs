//! Raw SessionData record definition
//!
//! The reader hands over a nested mapping that mirrors the MATLAB `SessionData`
//! struct. Leaves are numbers; JSON `null` stands in for NaN because JSON has
//! no NaN literal.

use serde_json::{Map, Value};

/// One session's raw, producer-native record
pub type RawRecord = Map<String, Value>;

/// Key holding the raw trial count
pub const N_TRIALS_KEY: &str = "nTrials";
/// Key holding the per-trial states/events
pub const RAW_EVENTS_KEY: &str = "RawEvents";
/// Sub-key of `RawEvents` holding the trial list
pub const TRIAL_KEY: &str = "Trial";
/// Key holding per-trial start offsets (seconds)
pub const TRIAL_START_KEY: &str = "TrialStartTimestamp";
/// Key holding per-trial end offsets (seconds); only written by Gen2 producers
pub const TRIAL_END_KEY: &str = "TrialEndTimestamp";
/// Key holding session information (date, start time, ...)
pub const INFO_KEY: &str = "Info";
pub const RAW_DATA_KEY: &str = "RawData";
pub const SETTINGS_FILE_KEY: &str = "SettingsFile";

/// Sub-keys of a raw trial
pub const STATES_KEY: &str = "States";
pub const EVENTS_KEY: &str = "Events";

/// Sub-keys of `Info` used to build the session start time
pub const SESSION_DATE_KEY: &str = "SessionDate";
pub const SESSION_START_TIME_KEY: &str = "SessionStartTime_UTC";

/// Top-level attributes a SessionData record is expected to carry
pub const DEFAULT_ATTRIBUTES: [&str; 7] = [
    INFO_KEY,
    N_TRIALS_KEY,
    RAW_EVENTS_KEY,
    RAW_DATA_KEY,
    TRIAL_START_KEY,
    TRIAL_END_KEY,
    SETTINGS_FILE_KEY,
];

/// Whether a top-level key belongs to the fixed attribute set
pub fn is_default_attribute(key: &str) -> bool {
    DEFAULT_ATTRIBUTES.contains(&key)
}

/// Read a numeric leaf. `null` is NaN; anything non-numeric is `None`.
pub fn numeric_leaf(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Null => Some(f64::NAN),
        _ => None,
    }
}

/// Read a 1-D numeric sequence, promoting a bare scalar to a one-element sequence.
///
/// Returns `None` when the value is nested deeper than one level or holds
/// non-numeric leaves.
pub fn numeric_sequence(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Array(items) => items.iter().map(numeric_leaf).collect(),
        other => numeric_leaf(other).map(|x| vec![x]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_leaf_null_is_nan() {
        assert!(numeric_leaf(&Value::Null).unwrap().is_nan());
        assert_eq!(numeric_leaf(&json!(2.5)), Some(2.5));
        assert_eq!(numeric_leaf(&json!(3)), Some(3.0));
        assert_eq!(numeric_leaf(&json!("x")), None);
    }

    #[test]
    fn test_numeric_sequence_promotes_scalar() {
        assert_eq!(numeric_sequence(&json!(4.0)), Some(vec![4.0]));
        assert_eq!(numeric_sequence(&json!([1.0, 2.0])), Some(vec![1.0, 2.0]));
        assert_eq!(numeric_sequence(&json!([[1.0, 2.0]])), None);
    }

    #[test]
    fn test_default_attributes() {
        assert!(is_default_attribute("RawEvents"));
        assert!(is_default_attribute("TrialEndTimestamp"));
        assert!(!is_default_attribute("TrialSettings"));
    }
}
