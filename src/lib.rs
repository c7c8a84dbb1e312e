//! bpod-session - Normalize Bpod SessionData records and derive trial statistics
//!
//! SessionData files are written by several producer generations and collapse
//! singleton values (one trial, one visit, one firing) differently from the
//! general case. This crate turns such a record into a uniformly shaped
//! session through a deterministic pipeline: record reader → version detection
//! → trial normalization → session model → derived tables.
//!
//! ## Modules
//!
//! - **Loading**: `reader`, `schema`, `normalizer`, `loader`
//! - **Model**: `session`, `types`, `outcome`
//! - **Analysis**: state durations, event occurrences, medians, dead time, port licks

pub mod analysis;
pub mod config;
pub mod error;
pub mod loader;
pub mod normalizer;
pub mod outcome;
pub mod reader;
pub mod schema;
pub mod session;
pub mod time;
pub mod types;

pub use config::{SessionConfig, UnknownAttributePolicy};
pub use error::{RecordLocation, SessionError};
pub use loader::{load, SessionLoader, SessionSource};
pub use outcome::TrialOutcomeClassifier;
pub use reader::{JsonRecordReader, RecordReader};
pub use schema::{RawRecord, SchemaVersion};
pub use session::{SessionModel, SessionSummary, TimeBasis, TrialTimeKind, TrialView};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
