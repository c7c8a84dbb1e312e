//! Derived tables and signals
//!
//! Pure functions over a loaded `SessionModel`:
//! - per-trial state durations and event occurrence counts
//! - per-group medians over long tables
//! - inter-trial dead time, port lick edges, used port discovery

pub mod median;
pub mod signals;
pub mod tables;

pub use median::{median, median_table, Cell, LongRow};
pub use signals::{dead_time, port_licks, port_signal, session_dead_time, used_port_numbers};
pub use tables::{
    event_occurrence_medians, event_occurrence_table, state_duration_medians,
    state_duration_table,
};
