//! Median reduction over long tables

use crate::error::SessionError;
use crate::types::{EventCountRow, MedianRow, MedianTable, StateDurationRow};

/// One cell of a long-format row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Index(usize),
    Text(&'a str),
    Number(f64),
}

impl Cell<'_> {
    fn group_key(&self) -> String {
        match self {
            Cell::Index(i) => i.to_string(),
            Cell::Text(s) => s.to_string(),
            Cell::Number(x) => x.to_string(),
        }
    }

    fn as_value(&self) -> Option<f64> {
        match self {
            Cell::Index(i) => Some(*i as f64),
            Cell::Number(x) => Some(*x),
            Cell::Text(_) => None,
        }
    }
}

/// A row of a long table whose columns can be addressed by name
pub trait LongRow {
    const COLUMNS: &'static [&'static str];

    fn cell(&self, column: &str) -> Option<Cell<'_>>;
}

impl LongRow for StateDurationRow {
    const COLUMNS: &'static [&'static str] = &["trial", "state", "duration"];

    fn cell(&self, column: &str) -> Option<Cell<'_>> {
        match column {
            "trial" => Some(Cell::Index(self.trial)),
            "state" => Some(Cell::Text(&self.state)),
            "duration" => Some(Cell::Number(self.duration)),
            _ => None,
        }
    }
}

impl LongRow for EventCountRow {
    const COLUMNS: &'static [&'static str] = &["trial", "event", "occurrences"];

    fn cell(&self, column: &str) -> Option<Cell<'_>> {
        match column {
            "trial" => Some(Cell::Index(self.trial)),
            "event" => Some(Cell::Text(&self.event)),
            "occurrences" => Some(Cell::Index(self.occurrences)),
            _ => None,
        }
    }
}

/// Median of `value_column` for each distinct value of `group_column`
///
/// Groups appear in first-occurrence order. NaN values are skipped; a group
/// holding only NaN has a NaN median.
pub fn median_table<R: LongRow>(
    rows: &[R],
    group_column: &str,
    value_column: &str,
) -> Result<MedianTable, SessionError> {
    for column in [group_column, value_column] {
        if !R::COLUMNS.contains(&column) {
            return Err(SessionError::InvalidArgument(format!(
                "unknown column '{}', expected one of {}",
                column,
                R::COLUMNS.join(", ")
            )));
        }
    }

    let pairs = rows
        .iter()
        .map(|row| {
            let group = row.cell(group_column).map(|c| c.group_key());
            let value = row.cell(value_column).and_then(|c| c.as_value());
            match (group, value) {
                (Some(group), Some(value)) => Ok((group, value)),
                _ => Err(SessionError::InvalidArgument(format!(
                    "column '{}' is not numeric",
                    value_column
                ))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MedianTable {
        group_column: group_column.to_string(),
        value_column: value_column.to_string(),
        rows: group_medians(pairs),
    })
}

pub(crate) fn group_medians(pairs: impl IntoIterator<Item = (String, f64)>) -> Vec<MedianRow> {
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();

    for (group, value) in pairs {
        match groups.iter_mut().find(|(g, _)| *g == group) {
            Some((_, values)) => values.push(value),
            None => groups.push((group, vec![value])),
        }
    }

    groups
        .into_iter()
        .map(|(group, values)| MedianRow {
            group,
            median: median(&values),
        })
        .collect()
}

/// Standard median, skipping NaN; the mean of the middle pair for even counts
pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
