//! Session clock helpers

use crate::error::SessionError;
use crate::schema::{SESSION_DATE_KEY, SESSION_START_TIME_KEY};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// MATLAB day numbers count from year 0, 366 days ahead of CE day numbers
const MATLAB_EPOCH_OFFSET_DAYS: i64 = 366;

/// Parse the session start from `Info.SessionDate` and `Info.SessionStartTime_UTC`
pub fn parse_session_start(
    info: &Map<String, Value>,
    format: &str,
) -> Result<DateTime<Utc>, SessionError> {
    let date = info_str(info, SESSION_DATE_KEY)?;
    let time = info_str(info, SESSION_START_TIME_KEY)?;
    let text = format!("{} {}", date, time);

    let naive = NaiveDateTime::parse_from_str(&text, format).map_err(|e| {
        SessionError::MetadataParseError(format!(
            "'{}' does not match '{}': {}",
            text, format, e
        ))
    })?;
    Ok(Utc.from_utc_datetime(&naive))
}

fn info_str<'a>(info: &'a Map<String, Value>, key: &str) -> Result<&'a str, SessionError> {
    info.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SessionError::MetadataParseError(format!("Info.{} missing", key)))
}

/// Offset a session start by a number of seconds
///
/// Returns `None` for a non-finite offset or one that leaves the calendar range.
pub fn offset_clock(start: DateTime<Utc>, seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros.abs() >= i64::MAX as f64 {
        return None;
    }
    start.checked_add_signed(Duration::microseconds(micros as i64))
}

/// Convert a MATLAB serial date number to a datetime
///
/// Returns `None` for non-finite or out-of-range input.
pub fn matlab_datenum_to_datetime(datenum: f64) -> Option<NaiveDateTime> {
    if !datenum.is_finite() {
        return None;
    }
    let whole_days = datenum.floor() as i64;
    let fraction = datenum - datenum.floor();

    let days_from_ce = i32::try_from(whole_days - MATLAB_EPOCH_OFFSET_DAYS).ok()?;
    let date = NaiveDate::from_num_days_from_ce_opt(days_from_ce)?;
    let micros = (fraction * 86_400_000_000.0).round() as i64;
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight + Duration::microseconds(micros))
}
