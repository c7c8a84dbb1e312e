//! Core types for the bpod-session pipeline
//!
//! This module defines the data structures that flow out of normalization:
//! normalized trials, the schema variant a session was written with, the typed
//! session attributes, and the long-format rows produced by the analysis
//! functions.

use crate::schema::SchemaVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One visit to a state: entry and exit offsets in seconds from trial start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub entry: f64,
    pub exit: f64,
}

impl Interval {
    pub fn new(entry: f64, exit: f64) -> Self {
        Self { entry, exit }
    }

    pub fn duration(&self) -> f64 {
        self.exit - self.entry
    }

    /// The (NaN, NaN) pair the producer writes for a state it never entered
    pub fn is_unvisited_sentinel(&self) -> bool {
        self.entry.is_nan() && self.exit.is_nan()
    }
}

/// All visits to one named state within a trial. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVisits {
    name: String,
    intervals: Vec<Interval>,
}

impl StateVisits {
    pub(crate) fn new(name: String, intervals: Vec<Interval>) -> Self {
        debug_assert!(!intervals.is_empty());
        Self { name, intervals }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// False when the only recorded interval is the unvisited sentinel
    pub fn was_visited(&self) -> bool {
        !self.intervals.iter().all(Interval::is_unvisited_sentinel)
    }

    /// Sum of (exit - entry) over every visit
    pub fn total_duration(&self) -> f64 {
        self.intervals.iter().map(Interval::duration).sum()
    }
}

/// All firings of one named event within a trial. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventTimes {
    name: String,
    timestamps: Vec<f64>,
}

impl EventTimes {
    pub(crate) fn new(name: String, timestamps: Vec<f64>) -> Self {
        debug_assert!(!timestamps.is_empty());
        Self { name, timestamps }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn occurrences(&self) -> usize {
        self.timestamps.len()
    }
}

/// One trial's states and events in canonical shape
///
/// States and events keep the order the producer wrote them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedTrial {
    states: Vec<StateVisits>,
    events: Vec<EventTimes>,
}

impl NormalizedTrial {
    pub(crate) fn new(states: Vec<StateVisits>, events: Vec<EventTimes>) -> Self {
        Self { states, events }
    }

    pub fn states(&self) -> &[StateVisits] {
        &self.states
    }

    pub fn events(&self) -> &[EventTimes] {
        &self.events
    }

    pub fn state(&self, name: &str) -> Option<&StateVisits> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&EventTimes> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.name.as_str())
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.name.as_str())
    }
}

/// Fields that only exist for one producer generation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "version", rename_all = "lowercase")]
pub enum SchemaVariant {
    Gen2 {
        /// Per-trial end offsets (seconds since session start)
        trial_end_offsets: Vec<f64>,
        /// Session start; `None` only when the session aborted before trial 1
        start_time: Option<DateTime<Utc>>,
    },
    Legacy,
}

impl SchemaVariant {
    pub fn version(&self) -> SchemaVersion {
        match self {
            SchemaVariant::Gen2 { .. } => SchemaVersion::Gen2,
            SchemaVariant::Legacy => SchemaVersion::Legacy,
        }
    }
}

/// Typed view of the fixed SessionData attributes that the model does not
/// normalize itself, plus any unexpected top-level keys
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionAttributes {
    /// The raw `Info` mapping (session date, start time, rig details, ...)
    pub info: Map<String, Value>,
    pub raw_data: Option<Value>,
    pub settings_file: Option<Value>,
    /// Top-level keys outside the fixed attribute set
    pub extra: Map<String, Value>,
}

/// Time spent in one state during one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDurationRow {
    pub trial: usize,
    pub state: String,
    pub duration: f64,
}

/// Number of firings of one event during one trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCountRow {
    pub trial: usize,
    pub event: String,
    pub occurrences: usize,
}

/// Median of one group in a long table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianRow {
    pub group: String,
    pub median: f64,
}

/// Per-group medians, labelled with the columns they were computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianTable {
    pub group_column: String,
    pub value_column: String,
    pub rows: Vec<MedianRow>,
}

impl MedianTable {
    pub fn get(&self, group: &str) -> Option<f64> {
        self.rows.iter().find(|r| r.group == group).map(|r| r.median)
    }
}

/// On/off edge timestamps of one digital port signal within a trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSignal {
    pub on: Vec<f64>,
    pub off: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_duration_sums_visits() {
        let visits = StateVisits::new(
            "Wait".to_string(),
            vec![Interval::new(1.0, 1.5), Interval::new(2.0, 2.2)],
        );
        assert!((visits.total_duration() - 0.7).abs() < 1e-9);
        assert!(visits.was_visited());
    }

    #[test]
    fn test_sentinel_is_unvisited() {
        let visits = StateVisits::new(
            "Punish".to_string(),
            vec![Interval::new(f64::NAN, f64::NAN)],
        );
        assert!(!visits.was_visited());
    }

    #[test]
    fn test_trial_lookup_by_name() {
        let trial = NormalizedTrial::new(
            vec![StateVisits::new("A".to_string(), vec![Interval::new(0.0, 1.0)])],
            vec![EventTimes::new("Tup".to_string(), vec![1.0])],
        );
        assert!(trial.state("A").is_some());
        assert!(trial.state("B").is_none());
        assert_eq!(trial.event("Tup").map(EventTimes::occurrences), Some(1));
        assert_eq!(trial.event_names().collect::<Vec<_>>(), vec!["Tup"]);
    }

    #[test]
    fn test_variant_version() {
        assert_eq!(SchemaVariant::Legacy.version(), SchemaVersion::Legacy);
        let gen2 = SchemaVariant::Gen2 {
            trial_end_offsets: vec![],
            start_time: None,
        };
        assert_eq!(gen2.version(), SchemaVersion::Gen2);
    }
}
