//! Dense windowed sums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticksmith_calendar::{floor, iter_window, next_boundary};
use ticksmith_types::{Step, TimeRange};

use crate::{AggregateError, Result, Sample};

/// One window of summed attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSum {
    /// Start of the window.
    pub timestamp: DateTime<Utc>,
    /// Attribute sums, in the order requested.
    pub values: Vec<(String, f64)>,
}

impl WindowSum {
    /// Returns the sum of `attribute` in this window.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, value)| *value)
    }
}

/// Sums attributes over calendar-aligned windows spanning the rows.
///
/// Windows run from the window holding the first row through the window
/// holding the last row. Every window yields one row; windows without data
/// sum to zero. Rows must be sorted by time.
///
/// # Errors
///
/// Returns an error if the rows are not sorted by time or a requested
/// attribute does not exist on the rows.
pub fn aggregate_sum<S: Sample>(
    rows: &[S],
    attrs: &[&str],
    window: Step,
) -> Result<Vec<WindowSum>> {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Ok(Vec::new());
    };
    ensure_sorted_samples(rows)?;
    if let Some(unknown) = attrs.iter().find(|attr| first.attribute(attr).is_none()) {
        return Err(AggregateError::UnknownAttribute((*unknown).to_string()));
    }

    let start = floor(first.sample_time(), window);
    let end = next_boundary(last.sample_time(), window);
    let Some(span) = TimeRange::try_new(start, end) else {
        return Ok(Vec::new());
    };

    let mut remaining = rows;
    let sums = iter_window(span, window)
        .map(|bucket| {
            let split = remaining.partition_point(|row| row.sample_time() < bucket.end());
            let (inside, rest) = remaining.split_at(split);
            remaining = rest;

            let values = attrs
                .iter()
                .map(|attr| {
                    let total = inside
                        .iter()
                        .filter_map(|row| row.attribute(attr))
                        .sum();
                    ((*attr).to_string(), total)
                })
                .collect();
            WindowSum {
                timestamp: bucket.start(),
                values,
            }
        })
        .collect();
    Ok(sums)
}

fn ensure_sorted_samples<S: Sample>(rows: &[S]) -> Result<()> {
    rows.windows(2)
        .position(|pair| pair[1].sample_time() < pair[0].sample_time())
        .map_or(Ok(()), |position| {
            Err(AggregateError::Unsorted {
                index: position + 1,
            })
        })
}
