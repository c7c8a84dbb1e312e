//! Inter-trial dead time and digital port signals

use crate::error::SessionError;
use crate::session::SessionModel;
use crate::types::{NormalizedTrial, PortSignal, SchemaVariant};

/// Absolute gaps between consecutive trials
///
/// For N trials returns N + 1 values. Entry 0 and entry N are always NaN:
/// nothing precedes the first start or follows the last end.
pub fn dead_time(starts: &[f64], ends: &[f64]) -> Result<Vec<f64>, SessionError> {
    if starts.len() != ends.len() {
        return Err(SessionError::InvalidArgument(format!(
            "dead time needs equal start/end counts, got {} and {}",
            starts.len(),
            ends.len()
        )));
    }

    let shifted_ends = std::iter::once(f64::NAN).chain(ends.iter().copied());
    let padded_starts = starts.iter().copied().chain(std::iter::once(f64::NAN));
    Ok(shifted_ends
        .zip(padded_starts)
        .map(|(end, start)| (end - start).abs())
        .collect())
}

/// Dead time of a loaded session; legacy sessions have no end offsets
pub fn session_dead_time(session: &SessionModel) -> Option<Vec<f64>> {
    match session.variant() {
        SchemaVariant::Gen2 {
            trial_end_offsets, ..
        } => dead_time(session.trial_start_offsets(), trial_end_offsets).ok(),
        SchemaVariant::Legacy => None,
    }
}

/// On/off edges of a digital signal within one trial
///
/// An event the trial never fired is replaced by a single NaN. With `align`,
/// a NaN is prepended to `on` when the signal was already on at trial start
/// (first off precedes first on), and appended to `off` when it was still on
/// at trial end (last off precedes last on). Only the boundaries are checked.
pub fn port_signal(
    trial: &NormalizedTrial,
    on_event: &str,
    off_event: &str,
    align: bool,
) -> PortSignal {
    let edges = |name: &str| {
        trial
            .event(name)
            .map_or_else(|| vec![f64::NAN], |e| e.timestamps().to_vec())
    };
    let mut on = edges(on_event);
    let mut off = edges(off_event);

    if align {
        if on[0] > off[0] {
            on.insert(0, f64::NAN);
        }
        if off[off.len() - 1] < on[on.len() - 1] {
            off.push(f64::NAN);
        }
    }

    PortSignal { on, off }
}

/// Lick edges for a numbered port (`{prefix}{port}In` / `{prefix}{port}Out`)
pub fn port_licks(trial: &NormalizedTrial, port: u32, prefix: &str, align: bool) -> PortSignal {
    port_signal(
        trial,
        &format!("{}{}In", prefix, port),
        &format!("{}{}Out", prefix, port),
        align,
    )
}

/// Distinct port numbers named by `{prefix}{n}...` events, in first-seen order
pub fn used_port_numbers<S: AsRef<str>>(events: &[S], prefix: &str) -> Vec<u32> {
    let mut ports: Vec<u32> = Vec::new();

    for event in events {
        let Some(rest) = event.as_ref().strip_prefix(prefix) else {
            continue;
        };
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if let Ok(port) = digits.parse::<u32>() {
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
    }

    ports
}
