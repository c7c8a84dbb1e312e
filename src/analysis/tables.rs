//! State duration and event occurrence tables

use super::median::group_medians;
use crate::session::SessionModel;
use crate::types::{EventCountRow, MedianTable, StateDurationRow};

/// Time spent in each visited state, per trial
///
/// Sparse: a state the trial never entered (absent, or only the NaN
/// sentinel) yields no row at all.
pub fn state_duration_table(session: &SessionModel) -> Vec<StateDurationRow> {
    session
        .trials()
        .iter()
        .enumerate()
        .flat_map(|(trial, record)| {
            record
                .states()
                .iter()
                .filter(|visits| visits.was_visited())
                .map(move |visits| StateDurationRow {
                    trial,
                    state: visits.name().to_string(),
                    duration: visits.total_duration(),
                })
        })
        .collect()
}

/// Number of firings of every session event, per trial
///
/// Dense: every trial gets a row for every name in `distinct_events`, with
/// zero for events that did not fire in that trial.
pub fn event_occurrence_table(session: &SessionModel) -> Vec<EventCountRow> {
    let mut rows = Vec::with_capacity(session.trial_count() * session.distinct_events().len());

    for (trial, record) in session.trials().iter().enumerate() {
        for event in session.distinct_events() {
            rows.push(EventCountRow {
                trial,
                event: event.clone(),
                occurrences: record.event(event).map_or(0, |e| e.occurrences()),
            });
        }
    }

    rows
}

/// Median duration per state
pub fn state_duration_medians(rows: &[StateDurationRow]) -> MedianTable {
    MedianTable {
        group_column: "state".to_string(),
        value_column: "duration".to_string(),
        rows: group_medians(rows.iter().map(|r| (r.state.clone(), r.duration))),
    }
}

/// Median occurrence count per event
pub fn event_occurrence_medians(rows: &[EventCountRow]) -> MedianTable {
    MedianTable {
        group_column: "event".to_string(),
        value_column: "occurrences".to_string(),
        rows: group_medians(rows.iter().map(|r| (r.event.clone(), r.occurrences as f64))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SessionLoader;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn session() -> SessionModel {
        let raw = json!({
            "nTrials": 4,
            "TrialStartTimestamp": [0.0, 10.0, 20.0, 30.0],
            "RawEvents": { "Trial": [
                { "States": { "Wait": [0.0, 2.0], "Reward": [2.0, 2.5] },
                  "Events": { "Port1In": 1.9 } },
                { "States": { "Wait": [0.0, 4.0], "Reward": [null, null] },
                  "Events": {} },
                { "States": { "Wait": [0.0, 1.0] },
                  "Events": { "Port1In": [0.5, 0.9], "Tup": 1.0 } },
                { "States": { "Wait": [[1.0, 1.5], [2.0, 2.2]] },
                  "Events": { "Port1In": [1.2, 2.1, 2.15] } }
            ]}
        });
        SessionLoader::default()
            .load_raw(raw.as_object().cloned().unwrap(), None)
            .unwrap()
    }

    #[test]
    fn test_duration_of_repeated_visits() {
        let rows = state_duration_table(&session());
        let row = rows
            .iter()
            .find(|r| r.trial == 3 && r.state == "Wait")
            .unwrap();
        assert!((row.duration - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_duration_table_is_sparse() {
        let rows = state_duration_table(&session());
        // Trial 1's Reward is the NaN sentinel and trials 2/3 never list it
        assert_eq!(rows.len(), 5);
        assert!(!rows.iter().any(|r| r.trial == 1 && r.state == "Reward"));
        assert!(rows.iter().all(|r| !r.duration.is_nan()));
    }

    #[test]
    fn test_occurrence_table_is_dense() {
        let session = session();
        let rows = event_occurrence_table(&session);
        assert_eq!(rows.len(), session.trial_count() * session.distinct_events().len());
        assert_eq!(rows.len(), 8);

        let count = |trial: usize, event: &str| {
            rows.iter()
                .find(|r| r.trial == trial && r.event == event)
                .map(|r| r.occurrences)
        };
        assert_eq!(count(0, "Port1In"), Some(1));
        assert_eq!(count(1, "Port1In"), Some(0));
        assert_eq!(count(1, "Tup"), Some(0));
        assert_eq!(count(3, "Port1In"), Some(3));
    }

    #[test]
    fn test_occurrence_medians() {
        let medians = event_occurrence_medians(&event_occurrence_table(&session()));
        assert_eq!(medians.rows.len(), 2);
        // Port1In counts: 1, 0, 2, 3 -> median 1.5
        assert_eq!(medians.get("Port1In"), Some(1.5));
        // Tup counts: 0, 0, 1, 0 -> median 0
        assert_eq!(medians.get("Tup"), Some(0.0));
    }

    #[test]
    fn test_duration_medians() {
        let medians = state_duration_medians(&state_duration_table(&session()));
        assert_eq!(medians.group_column, "state");
        let groups: Vec<&str> = medians.rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(groups, vec!["Wait", "Reward"]);
        // Wait durations: 2.0, 4.0, 1.0, 0.7 -> median 1.5
        assert!((medians.get("Wait").unwrap() - 1.5).abs() < 1e-9);
    }
}
