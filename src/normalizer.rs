//! Trial normalization
//!
//! This module converts one raw trial into canonical shapes:
//! - every state becomes a non-empty list of (entry, exit) intervals
//! - every event becomes a non-empty list of timestamps
//!
//! The producer collapses singletons: a state visited once is written as a
//! flat pair and an event that fired once as a bare scalar. Those collapses
//! are undone here and nowhere else.

use crate::error::{RecordLocation, SessionError};
use crate::schema::{numeric_leaf, numeric_sequence, EVENTS_KEY, STATES_KEY};
use crate::types::{EventTimes, Interval, NormalizedTrial, StateVisits};
use serde_json::{Map, Value};

/// Normalizer for converting raw trials to normalized trials
pub struct TrialNormalizer;

impl TrialNormalizer {
    /// Normalize one raw trial sub-record (`RawEvents.Trial{trial}`)
    pub fn normalize(trial: usize, raw: &Value) -> Result<NormalizedTrial, SessionError> {
        let raw = raw.as_object().ok_or_else(|| {
            SessionError::malformed(
                RecordLocation::trial(trial, "Trial"),
                "expected a mapping with States and Events",
            )
        })?;

        let states = section(trial, raw, STATES_KEY)?
            .iter()
            .map(|(name, value)| {
                normalize_state(trial, name, value).map(|iv| StateVisits::new(name.clone(), iv))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let events = section(trial, raw, EVENTS_KEY)?
            .iter()
            .map(|(name, value)| {
                normalize_event(trial, name, value).map(|ts| EventTimes::new(name.clone(), ts))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NormalizedTrial::new(states, events))
    }
}

/// Fetch the States or Events mapping of a trial
fn section<'a>(
    trial: usize,
    raw: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Map<String, Value>, SessionError> {
    match raw.get(key) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(SessionError::malformed(
            RecordLocation::trial(trial, key),
            "expected a mapping",
        )),
        None => Err(SessionError::malformed(
            RecordLocation::trial(trial, key),
            "missing",
        )),
    }
}

/// Reshape a state's raw value to a (k, 2) list of intervals, k >= 1
fn normalize_state(trial: usize, name: &str, value: &Value) -> Result<Vec<Interval>, SessionError> {
    let location = || RecordLocation::trial(trial, format!("{}.{}", STATES_KEY, name));

    let rows: Vec<&Value> = match value {
        // List of pairs: [[entry, exit], ...]
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_array) => {
            items.iter().collect()
        }
        // Single visit collapsed to a flat pair: [entry, exit]
        Value::Array(_) => vec![value],
        _ => {
            return Err(SessionError::malformed(
                location(),
                "expected an interval pair or a list of interval pairs",
            ))
        }
    };

    rows.into_iter()
        .map(|row| match row.as_array().map(Vec::as_slice) {
            Some([entry, exit]) => match (numeric_leaf(entry), numeric_leaf(exit)) {
                (Some(entry), Some(exit)) => Ok(Interval::new(entry, exit)),
                _ => Err(SessionError::malformed(location(), "non-numeric interval bound")),
            },
            _ => Err(SessionError::malformed(
                location(),
                "cannot reshape to (k, 2) intervals",
            )),
        })
        .collect()
}

/// Flatten an event's raw value to a non-empty list of timestamps
fn normalize_event(trial: usize, name: &str, value: &Value) -> Result<Vec<f64>, SessionError> {
    let location = || RecordLocation::trial(trial, format!("{}.{}", EVENTS_KEY, name));

    match numeric_sequence(value) {
        Some(timestamps) if !timestamps.is_empty() => Ok(timestamps),
        Some(_) => Err(SessionError::malformed(location(), "empty timestamp list")),
        None => Err(SessionError::malformed(
            location(),
            "expected a timestamp or a list of timestamps",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_flat_pair_becomes_single_interval() {
        let raw = json!({
            "States": { "WaitForPoke": [0.0, 1.25] },
            "Events": {}
        });
        let trial = TrialNormalizer::normalize(0, &raw).unwrap();
        let visits = trial.state("WaitForPoke").unwrap();
        assert_eq!(visits.intervals(), &[Interval::new(0.0, 1.25)]);
    }

    #[test]
    fn test_list_of_pairs_keeps_every_visit() {
        let raw = json!({
            "States": { "Wait": [[1.0, 1.5], [2.0, 2.2]] },
            "Events": {}
        });
        let trial = TrialNormalizer::normalize(3, &raw).unwrap();
        let visits = trial.state("Wait").unwrap();
        assert_eq!(visits.intervals().len(), 2);
        assert!((visits.total_duration() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_null_pair_is_kept_as_nan_sentinel() {
        let raw = json!({
            "States": { "Punish": [null, null] },
            "Events": {}
        });
        let trial = TrialNormalizer::normalize(0, &raw).unwrap();
        let visits = trial.state("Punish").unwrap();
        assert_eq!(visits.intervals().len(), 1);
        assert!(visits.intervals()[0].is_unvisited_sentinel());
    }

    #[test]
    fn test_scalar_event_is_wrapped() {
        let raw = json!({
            "States": {},
            "Events": { "Tup": 3.5, "Port1In": [1.0, 2.0, 4.0] }
        });
        let trial = TrialNormalizer::normalize(0, &raw).unwrap();
        assert_eq!(trial.event("Tup").unwrap().timestamps(), &[3.5]);
        assert_eq!(trial.event("Port1In").unwrap().occurrences(), 3);
    }

    #[test]
    fn test_key_order_is_preserved() {
        let raw = json!({
            "States": { "Zeta": [0.0, 1.0], "Alpha": [1.0, 2.0] },
            "Events": { "Tup": 1.0, "BNC1High": 0.5 }
        });
        let trial = TrialNormalizer::normalize(0, &raw).unwrap();
        assert_eq!(trial.state_names().collect::<Vec<_>>(), vec!["Zeta", "Alpha"]);
        assert_eq!(trial.event_names().collect::<Vec<_>>(), vec!["Tup", "BNC1High"]);
    }

    #[test]
    fn test_bad_state_shape_names_trial_and_state() {
        let raw = json!({
            "States": { "Broken": [1.0, 2.0, 3.0] },
            "Events": {}
        });
        let err = TrialNormalizer::normalize(7, &raw).unwrap_err();
        match err {
            SessionError::MalformedRecord { location, .. } => {
                assert_eq!(location, RecordLocation::trial(7, "States.Broken"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_scalar_state_is_rejected() {
        let raw = json!({ "States": { "Odd": 1.0 }, "Events": {} });
        assert!(TrialNormalizer::normalize(0, &raw).is_err());
    }

    #[test]
    fn test_ragged_pairs_are_rejected() {
        let raw = json!({ "States": { "Odd": [[1.0, 2.0], [3.0]] }, "Events": {} });
        assert!(TrialNormalizer::normalize(0, &raw).is_err());
    }

    #[test]
    fn test_empty_event_list_is_rejected() {
        let raw = json!({ "States": {}, "Events": { "Tup": [] } });
        assert!(TrialNormalizer::normalize(0, &raw).is_err());
    }

    #[test]
    fn test_missing_states_is_rejected() {
        let raw = json!({ "Events": {} });
        let err = TrialNormalizer::normalize(2, &raw).unwrap_err();
        assert!(err.to_string().contains("trial 2 field 'States'"));
    }
}
