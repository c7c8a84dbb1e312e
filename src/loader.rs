//! Session loading
//!
//! This module provides the public entry point for building a `SessionModel`.
//! It orchestrates the steps from raw record to normalized session:
//! reader → version detection → offset coercion → trial unwrapping →
//! per-trial normalization → start time parsing.

use crate::config::{SessionConfig, UnknownAttributePolicy};
use crate::error::{RecordLocation, SessionError};
use crate::normalizer::TrialNormalizer;
use crate::reader::{JsonRecordReader, RecordReader};
use crate::schema::{
    is_default_attribute, numeric_leaf, numeric_sequence, RawRecord, SchemaVersion, INFO_KEY,
    N_TRIALS_KEY, RAW_DATA_KEY, RAW_EVENTS_KEY, SETTINGS_FILE_KEY, TRIAL_END_KEY, TRIAL_KEY,
    TRIAL_START_KEY,
};
use crate::session::SessionModel;
use crate::time::parse_session_start;
use crate::types::{SchemaVariant, SessionAttributes};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Where a session comes from: a file on disk or an already-parsed record
#[derive(Debug, Clone)]
pub enum SessionSource {
    Path(PathBuf),
    Raw(RawRecord),
}

impl From<PathBuf> for SessionSource {
    fn from(path: PathBuf) -> Self {
        SessionSource::Path(path)
    }
}

impl From<&Path> for SessionSource {
    fn from(path: &Path) -> Self {
        SessionSource::Path(path.to_path_buf())
    }
}

impl From<RawRecord> for SessionSource {
    fn from(raw: RawRecord) -> Self {
        SessionSource::Raw(raw)
    }
}

/// Load a session with the default configuration and the JSON reader.
///
/// # Example
/// ```ignore
/// let session = bpod_session::load(std::path::Path::new("SessionData.json"))?;
/// println!("{}", session.summary());
/// ```
pub fn load(source: impl Into<SessionSource>) -> Result<SessionModel, SessionError> {
    SessionLoader::default().load(source)
}

/// Builds `SessionModel`s from raw SessionData records
#[derive(Debug, Clone, Default)]
pub struct SessionLoader {
    config: SessionConfig,
}

impl SessionLoader {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn load(&self, source: impl Into<SessionSource>) -> Result<SessionModel, SessionError> {
        match source.into() {
            SessionSource::Path(path) => self.load_path(&path),
            SessionSource::Raw(raw) => self.load_raw(raw, None),
        }
    }

    /// Read and load a JSON SessionData export
    pub fn load_path(&self, path: &Path) -> Result<SessionModel, SessionError> {
        self.load_path_with(&JsonRecordReader, path)
    }

    /// Read a file through any record reader, then load it
    pub fn load_path_with(
        &self,
        reader: &dyn RecordReader,
        path: &Path,
    ) -> Result<SessionModel, SessionError> {
        let raw = reader.read(path)?;
        self.load_raw(raw, Some(path.to_path_buf()))
    }

    /// Normalize an already-parsed raw record
    pub fn load_raw(
        &self,
        raw: RawRecord,
        source: Option<PathBuf>,
    ) -> Result<SessionModel, SessionError> {
        if !raw.keys().any(|k| is_default_attribute(k)) {
            return Err(SessionError::malformed(
                RecordLocation::session(N_TRIALS_KEY),
                "record carries no SessionData attributes",
            ));
        }

        let version = SchemaVersion::detect(&raw);
        log::debug!("detected {} SessionData record", version.as_str());

        let attributes = self.split_attributes(&raw)?;

        // Sessions that error before trial 1 completes carry no trial count
        let n_trials = match raw.get(N_TRIALS_KEY) {
            Some(value) => trial_count(value)?,
            None => {
                log::warn!("record has no {}; treating as an aborted session", N_TRIALS_KEY);
                0
            }
        };
        if n_trials == 0 {
            let variant = match version {
                SchemaVersion::Gen2 => SchemaVariant::Gen2 {
                    trial_end_offsets: Vec::new(),
                    start_time: None,
                },
                SchemaVersion::Legacy => SchemaVariant::Legacy,
            };
            return Ok(SessionModel::empty(source, variant, attributes));
        }

        let trial_start_offsets = offsets(&raw, TRIAL_START_KEY, n_trials)?;
        let variant = match version {
            SchemaVersion::Gen2 => SchemaVariant::Gen2 {
                trial_end_offsets: offsets(&raw, TRIAL_END_KEY, n_trials)?,
                start_time: Some(parse_session_start(
                    &attributes.info,
                    &self.config.start_time_format,
                )?),
            },
            SchemaVersion::Legacy => SchemaVariant::Legacy,
        };

        let trials = raw_trials(&raw, n_trials)?
            .into_iter()
            .enumerate()
            .map(|(index, trial)| TrialNormalizer::normalize(index, trial))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("loaded {} trials ({})", trials.len(), version.as_str());

        Ok(SessionModel::new(
            source,
            trials,
            trial_start_offsets,
            variant,
            attributes,
        ))
    }

    /// Pull out the attributes the model carries verbatim and route unknown keys
    fn split_attributes(&self, raw: &RawRecord) -> Result<SessionAttributes, SessionError> {
        let info = match raw.get(INFO_KEY) {
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(SessionError::malformed(
                    RecordLocation::session(INFO_KEY),
                    "expected a mapping",
                ))
            }
            None => Default::default(),
        };

        let mut extra = serde_json::Map::new();
        for (key, value) in raw.iter().filter(|(k, _)| !is_default_attribute(k)) {
            match self.config.unknown_attributes {
                UnknownAttributePolicy::Collect => {
                    log::debug!("collecting unknown attribute '{}'", key);
                    extra.insert(key.clone(), value.clone());
                }
                UnknownAttributePolicy::Reject => {
                    return Err(SessionError::malformed(
                        RecordLocation::session(key.as_str()),
                        "not a SessionData attribute",
                    ))
                }
            }
        }

        Ok(SessionAttributes {
            info,
            raw_data: raw.get(RAW_DATA_KEY).cloned(),
            settings_file: raw.get(SETTINGS_FILE_KEY).cloned(),
            extra,
        })
    }
}

/// Read `nTrials` as a non-negative whole number
fn trial_count(value: &Value) -> Result<usize, SessionError> {
    match numeric_leaf(value) {
        Some(n) if n.is_finite() && n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        _ => Err(SessionError::malformed(
            RecordLocation::session(N_TRIALS_KEY),
            "expected a non-negative whole number",
        )),
    }
}

/// Coerce a per-trial timestamp field to exactly `n_trials` values
fn offsets(raw: &RawRecord, key: &str, n_trials: usize) -> Result<Vec<f64>, SessionError> {
    let value = raw
        .get(key)
        .ok_or_else(|| SessionError::malformed(RecordLocation::session(key), "missing"))?;

    let offsets = numeric_sequence(value).ok_or_else(|| {
        SessionError::malformed(RecordLocation::session(key), "expected a list of numbers")
    })?;

    if offsets.len() != n_trials {
        return Err(SessionError::malformed(
            RecordLocation::session(key),
            format!("expected {} values, found {}", n_trials, offsets.len()),
        ));
    }
    Ok(offsets)
}

/// The raw per-trial records, one per trial index
///
/// Single-trial files store `RawEvents.Trial` as the trial mapping itself
/// rather than a one-element list.
fn raw_trials(raw: &RawRecord, n_trials: usize) -> Result<Vec<&Value>, SessionError> {
    let location = || RecordLocation::session(format!("{}.{}", RAW_EVENTS_KEY, TRIAL_KEY));

    let trials = raw
        .get(RAW_EVENTS_KEY)
        .and_then(|events| events.get(TRIAL_KEY))
        .ok_or_else(|| SessionError::malformed(location(), "missing"))?;

    match trials {
        Value::Object(_) if n_trials == 1 => {
            log::debug!("single-trial session; wrapping the lone trial record");
            Ok(vec![trials])
        }
        Value::Array(items) if items.len() >= n_trials => Ok(items.iter().take(n_trials).collect()),
        Value::Array(items) => Err(SessionError::malformed(
            location(),
            format!("expected {} trials, found {}", n_trials, items.len()),
        )),
        _ => Err(SessionError::malformed(location(), "expected a list of trials")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    fn record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    fn gen2_record() -> Value {
        json!({
            "Info": { "SessionDate": "15-Jan-2024", "SessionStartTime_UTC": "14:00:00" },
            "nTrials": 3,
            "TrialStartTimestamp": [0.0, 10.0, 25.0],
            "TrialEndTimestamp": [8.0, 21.0, 30.0],
            "RawEvents": { "Trial": [
                { "States": { "WaitForPoke": [0.0, 1.0], "Reward": [1.0, 1.1] },
                  "Events": { "Port1In": 0.9 } },
                { "States": { "WaitForPoke": [[0.0, 1.0], [2.0, 4.0]] },
                  "Events": { "Port1In": [1.0, 3.0], "Port1Out": [1.5, 3.5] } },
                { "States": { "WaitForPoke": [0.0, 0.5], "Punish": [0.5, 2.5] },
                  "Events": { "Port2In": 0.4, "Tup": 2.5 } }
            ]},
            "SettingsFile": { "RewardAmount": 3 }
        })
    }

    #[test]
    fn test_load_gen2_session() {
        let session = SessionLoader::default()
            .load_raw(record(gen2_record()), None)
            .unwrap();

        assert_eq!(session.trial_count(), 3);
        assert_eq!(session.schema_version(), SchemaVersion::Gen2);
        assert_eq!(session.trial_start_offsets(), &[0.0, 10.0, 25.0]);
        assert_eq!(session.trial_end_offsets(), Some(&[8.0, 21.0, 30.0][..]));
        assert_eq!(
            session.start_time(),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap())
        );
        assert_eq!(
            session.distinct_states(),
            &["WaitForPoke", "Reward", "Punish"].map(String::from)
        );
        assert_eq!(
            session.distinct_events(),
            &["Port1In", "Port1Out", "Port2In", "Tup"].map(String::from)
        );
        assert_eq!(
            session.attributes().settings_file,
            Some(json!({ "RewardAmount": 3 }))
        );
    }

    #[test]
    fn test_single_trial_is_wrapped() {
        let raw = json!({
            "Info": { "SessionDate": "15-Jan-2024", "SessionStartTime_UTC": "14:00:00" },
            "nTrials": 1,
            "TrialStartTimestamp": 0.0,
            "TrialEndTimestamp": 12.0,
            "RawEvents": { "Trial": {
                "States": { "ITI": [0.0, 12.0] },
                "Events": { "Tup": 12.0 }
            }}
        });
        let session = SessionLoader::default().load_raw(record(raw), None).unwrap();

        assert_eq!(session.trial_count(), 1);
        assert_eq!(session.trials().len(), 1);
        assert_eq!(session.trial_start_offsets(), &[0.0]);
        let trial = &session.trials()[0];
        assert_eq!(trial.event("Tup").unwrap().timestamps(), &[12.0]);
    }

    #[test]
    fn test_legacy_session_has_no_start_time() {
        let raw = json!({
            "nTrials": 2,
            "TrialStartTimestamp": [0.0, 5.0],
            "RawEvents": { "Trial": [
                { "States": { "A": [0.0, 1.0] }, "Events": {} },
                { "States": { "A": [0.0, 2.0] }, "Events": {} }
            ]}
        });
        let session = SessionLoader::default().load_raw(record(raw), None).unwrap();

        assert_eq!(session.schema_version(), SchemaVersion::Legacy);
        assert_eq!(session.start_time(), None);
        assert_eq!(session.trial_end_offsets(), None);
        assert_eq!(session.trial_count(), 2);
    }

    #[test]
    fn test_aborted_session_is_empty() {
        let raw = json!({
            "Info": { "SessionDate": "15-Jan-2024" },
            "TrialEndTimestamp": []
        });
        let session = SessionLoader::default().load_raw(record(raw), None).unwrap();

        assert_eq!(session.trial_count(), 0);
        assert!(session.distinct_states().is_empty());
        assert!(session.distinct_events().is_empty());
        assert_eq!(session.start_time(), None);
    }

    #[test]
    fn test_record_without_session_attributes_is_malformed() {
        let raw = json!({ "__header__": "MATLAB 5.0 MAT-file", "__version__": "1.0" });
        let err = SessionLoader::default()
            .load_raw(record(raw), None)
            .unwrap_err();
        match err {
            SessionError::MalformedRecord { location, .. } => {
                assert_eq!(location, RecordLocation::session(N_TRIALS_KEY));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_export_with_file_header_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let export = json!({
            "__header__": "MATLAB 5.0 MAT-file",
            "__version__": "1.0",
            "__globals__": [],
            "SessionData": gen2_record()
        });
        write!(file, "{}", export).unwrap();

        let session = load(file.path()).unwrap();
        assert_eq!(session.trial_count(), 3);
        assert!(session.attributes().extra.is_empty());
    }

    #[test]
    fn test_gen2_missing_start_fields_is_metadata_error() {
        let mut raw = gen2_record();
        raw["Info"] = json!({});
        let err = SessionLoader::default()
            .load_raw(record(raw), None)
            .unwrap_err();
        assert!(matches!(err, SessionError::MetadataParseError(_)));
    }

    #[test]
    fn test_malformed_trial_is_reported_with_context() {
        let mut raw = gen2_record();
        raw["RawEvents"]["Trial"][2]["States"]["Punish"] = json!([0.5, 2.5, 3.0]);
        let err = SessionLoader::default()
            .load_raw(record(raw), None)
            .unwrap_err();
        match err {
            SessionError::MalformedRecord { location, .. } => {
                assert_eq!(location, RecordLocation::trial(2, "States.Punish"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_offset_length_mismatch() {
        let mut raw = gen2_record();
        raw["TrialEndTimestamp"] = json!([8.0, 21.0]);
        let err = SessionLoader::default()
            .load_raw(record(raw), None)
            .unwrap_err();
        assert!(err.to_string().contains("TrialEndTimestamp"));
    }

    #[test]
    fn test_too_few_trials() {
        let mut raw = gen2_record();
        raw["nTrials"] = json!(4);
        raw["TrialStartTimestamp"] = json!([0.0, 1.0, 2.0, 3.0]);
        raw["TrialEndTimestamp"] = json!([0.5, 1.5, 2.5, 3.5]);
        let err = SessionLoader::default()
            .load_raw(record(raw), None)
            .unwrap_err();
        assert!(err.to_string().contains("expected 4 trials, found 3"));
    }

    #[test]
    fn test_unknown_attributes_collected_or_rejected() {
        let mut raw = gen2_record();
        raw["TrialSettings"] = json!([{ "GUI": {} }]);

        let session = SessionLoader::default()
            .load_raw(record(raw.clone()), None)
            .unwrap();
        assert!(session.attributes().extra.contains_key("TrialSettings"));

        let strict = SessionLoader::new(SessionConfig {
            unknown_attributes: UnknownAttributePolicy::Reject,
            ..Default::default()
        });
        let err = strict.load_raw(record(raw), None).unwrap_err();
        assert!(matches!(err, SessionError::MalformedRecord { .. }));
    }

    #[test]
    fn test_fractional_trial_count_is_rejected() {
        let mut raw = gen2_record();
        raw["nTrials"] = json!(2.5);
        assert!(SessionLoader::default().load_raw(record(raw), None).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let wrapped = json!({ "SessionData": gen2_record() });
        write!(file, "{}", wrapped).unwrap();

        let session = load(file.path()).unwrap();
        assert_eq!(session.trial_count(), 3);
        assert_eq!(session.source(), Some(file.path()));
    }

    #[test]
    fn test_load_missing_path_is_unreadable() {
        let err = load(Path::new("/nonexistent/SessionData.json")).unwrap_err();
        assert!(matches!(err, SessionError::FileUnreadable { .. }));
    }

    #[test]
    fn test_load_from_raw_source() {
        let session = load(record(gen2_record())).unwrap();
        assert_eq!(session.source(), None);
        assert_eq!(session.trial_count(), 3);
    }
}
