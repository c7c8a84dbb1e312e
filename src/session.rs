//! Session model
//!
//! The canonical, immutable representation of one loaded session. Built once
//! by the loader; every analysis function reads from it.

use crate::error::{RecordLocation, SessionError};
use crate::outcome::TrialOutcomeClassifier;
use crate::schema::{SchemaVersion, TRIAL_START_KEY};
use crate::time::offset_clock;
use crate::types::{NormalizedTrial, SchemaVariant, SessionAttributes};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A fully normalized session
#[derive(Debug, Clone, Serialize)]
pub struct SessionModel {
    source: Option<PathBuf>,
    trials: Vec<NormalizedTrial>,
    variant: SchemaVariant,
    distinct_states: Vec<String>,
    distinct_events: Vec<String>,
    trial_start_offsets: Vec<f64>,
    attributes: SessionAttributes,
}

impl SessionModel {
    /// Assemble a session, deriving the distinct state/event names from the trials
    pub(crate) fn new(
        source: Option<PathBuf>,
        trials: Vec<NormalizedTrial>,
        trial_start_offsets: Vec<f64>,
        variant: SchemaVariant,
        attributes: SessionAttributes,
    ) -> Self {
        let (distinct_states, distinct_events) = distinct_names(&trials);
        Self {
            source,
            trials,
            variant,
            distinct_states,
            distinct_events,
            trial_start_offsets,
            attributes,
        }
    }

    /// A session that aborted before its first trial completed
    pub(crate) fn empty(
        source: Option<PathBuf>,
        variant: SchemaVariant,
        attributes: SessionAttributes,
    ) -> Self {
        Self::new(source, Vec::new(), Vec::new(), variant, attributes)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }

    pub fn trials(&self) -> &[NormalizedTrial] {
        &self.trials
    }

    pub fn trial(&self, index: usize) -> Option<TrialView<'_>> {
        (index < self.trials.len()).then_some(TrialView {
            session: self,
            index,
        })
    }

    pub fn trials_iter(&self) -> impl Iterator<Item = TrialView<'_>> {
        (0..self.trials.len()).map(move |index| TrialView {
            session: self,
            index,
        })
    }

    pub fn variant(&self) -> &SchemaVariant {
        &self.variant
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.variant.version()
    }

    /// Every state entered in any trial, in first-seen order
    pub fn distinct_states(&self) -> &[String] {
        &self.distinct_states
    }

    /// Every event fired in any trial, in first-seen order
    pub fn distinct_events(&self) -> &[String] {
        &self.distinct_events
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        match &self.variant {
            SchemaVariant::Gen2 { start_time, .. } => *start_time,
            SchemaVariant::Legacy => None,
        }
    }

    /// Trial start offsets in seconds since session start
    pub fn trial_start_offsets(&self) -> &[f64] {
        &self.trial_start_offsets
    }

    /// Trial end offsets; legacy producers never wrote them
    pub fn trial_end_offsets(&self) -> Option<&[f64]> {
        match &self.variant {
            SchemaVariant::Gen2 {
                trial_end_offsets, ..
            } => Some(trial_end_offsets),
            SchemaVariant::Legacy => None,
        }
    }

    pub fn attributes(&self) -> &SessionAttributes {
        &self.attributes
    }

    /// Per-trial clock start times or durations
    pub fn trial_times(&self, kind: TrialTimeKind) -> Result<TrialTimes, SessionError> {
        match kind {
            TrialTimeKind::Start => {
                let start = self.start_time().ok_or_else(|| {
                    SessionError::InvalidArgument(format!(
                        "trial start times need a session start time ({} session)",
                        self.schema_version().as_str()
                    ))
                })?;
                let times = self
                    .trial_start_offsets
                    .iter()
                    .enumerate()
                    .map(|(index, &offset)| clock_time(start, index, offset))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TrialTimes::Start(times))
            }
            TrialTimeKind::Duration => match &self.variant {
                SchemaVariant::Gen2 {
                    trial_end_offsets, ..
                } => Ok(TrialTimes::Duration(
                    trial_end_offsets
                        .iter()
                        .zip(&self.trial_start_offsets)
                        .map(|(end, start)| end - start)
                        .collect(),
                )),
                SchemaVariant::Legacy => Err(SessionError::InvalidArgument(
                    "trial durations need end offsets, which legacy sessions lack".to_string(),
                )),
            },
        }
    }

    /// Label every trial with a caller-defined outcome
    pub fn outcomes<C: TrialOutcomeClassifier>(&self, classifier: &C) -> Vec<C::Outcome> {
        self.trials_iter().map(|t| classifier.classify(&t)).collect()
    }

    pub fn summary(&self) -> SessionSummary {
        // Legacy sessions have no end offsets; the last start is the best bound
        let last_offset = match &self.variant {
            SchemaVariant::Gen2 {
                trial_end_offsets, ..
            } => trial_end_offsets.last(),
            SchemaVariant::Legacy => self.trial_start_offsets.last(),
        };

        SessionSummary {
            filename: self.source.as_ref().map(|p| p.display().to_string()),
            schema_version: self.schema_version(),
            trial_count: self.trial_count(),
            elapsed_minutes: last_offset.map(|s| s / 60.0),
            start_time: self.start_time(),
            states: self.distinct_states.clone(),
            events: self.distinct_events.clone(),
        }
    }
}

fn clock_time(
    start: DateTime<Utc>,
    index: usize,
    offset: f64,
) -> Result<DateTime<Utc>, SessionError> {
    offset_clock(start, offset).ok_or_else(|| {
        SessionError::malformed(
            RecordLocation::session(TRIAL_START_KEY),
            format!("trial {} offset {} is not a valid time", index, offset),
        )
    })
}

/// Scan every trial once, collecting names in first-seen order
fn distinct_names(trials: &[NormalizedTrial]) -> (Vec<String>, Vec<String>) {
    let mut states: Vec<String> = Vec::new();
    let mut events: Vec<String> = Vec::new();

    for trial in trials {
        for name in trial.state_names() {
            if !states.iter().any(|s| s == name) {
                states.push(name.to_string());
            }
        }
        for name in trial.event_names() {
            if !events.iter().any(|e| e == name) {
                events.push(name.to_string());
            }
        }
    }

    (states, events)
}

/// A borrowed handle on one trial of a session
#[derive(Debug, Clone, Copy)]
pub struct TrialView<'a> {
    session: &'a SessionModel,
    index: usize,
}

impl<'a> TrialView<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn session(&self) -> &'a SessionModel {
        self.session
    }

    pub fn record(&self) -> &'a NormalizedTrial {
        &self.session.trials[self.index]
    }

    pub fn start_time(&self, basis: TimeBasis) -> Result<TrialStart, SessionError> {
        let offset = self
            .session
            .trial_start_offsets
            .get(self.index)
            .copied()
            .ok_or_else(|| {
                SessionError::InvalidArgument(format!("no start offset for trial {}", self.index))
            })?;

        match basis {
            TimeBasis::Trial => Ok(TrialStart::Offset(offset)),
            TimeBasis::Clock => {
                let start = self.session.start_time().ok_or_else(|| {
                    SessionError::InvalidArgument(
                        "clock basis needs a session start time".to_string(),
                    )
                })?;
                clock_time(start, self.index, offset).map(TrialStart::Clock)
            }
        }
    }

    pub fn outcome<C: TrialOutcomeClassifier>(&self, classifier: &C) -> C::Outcome {
        classifier.classify(self)
    }
}

/// Reference frame for a trial's start time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBasis {
    /// Seconds since session start
    Trial,
    /// Wall-clock time (UTC)
    Clock,
}

impl FromStr for TimeBasis {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(TimeBasis::Trial),
            "clock" => Ok(TimeBasis::Clock),
            other => Err(SessionError::InvalidArgument(format!(
                "time basis '{}' is not 'trial' or 'clock'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrialStart {
    Offset(f64),
    Clock(DateTime<Utc>),
}

/// Which per-trial time series to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialTimeKind {
    Start,
    Duration,
}

impl FromStr for TrialTimeKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(TrialTimeKind::Start),
            "duration" => Ok(TrialTimeKind::Duration),
            other => Err(SessionError::InvalidArgument(format!(
                "time type '{}' is not 'start' or 'duration'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialTimes {
    Start(Vec<DateTime<Utc>>),
    Duration(Vec<f64>),
}

/// Short text overview of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub filename: Option<String>,
    pub schema_version: SchemaVersion,
    pub trial_count: usize,
    pub elapsed_minutes: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub states: Vec<String>,
    pub events: Vec<String>,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Filename: {}",
            self.filename.as_deref().unwrap_or("<in memory>")
        )?;
        write!(f, "{} trials completed", self.trial_count)?;
        if let Some(minutes) = self.elapsed_minutes {
            write!(f, " in {:.1} minutes", minutes)?;
        }
        match self.start_time {
            Some(start) => writeln!(f, " on {}", start.format("%Y-%m-%d %H:%M:%S"))?,
            None => writeln!(f, " ({} session, start unknown)", self.schema_version.as_str())?,
        }
        writeln!(f, "All states: {}", self.states.join(", "))?;
        writeln!(f, "All events: {}", self.events.join(", "))
    }
}
