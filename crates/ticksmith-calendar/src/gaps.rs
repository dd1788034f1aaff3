//! Coverage checks against already computed intervals.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use ticksmith_types::{Frequency, Step, TimeRange};

use crate::{Direction, floor};

/// Minute-level index of instants that are already computed.
///
/// Catalog entries of coarser frequency expand into every minute they cover,
/// so a day entry answers for all 1440 of its minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingIndex {
    minutes: BTreeSet<DateTime<Utc>>,
}

impl ExistingIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a catalog entry starting at `timestamp`.
    pub fn insert(&mut self, timestamp: DateTime<Utc>, frequency: Frequency) {
        let start = floor(timestamp, Step::MINUTE);
        for offset in 0..frequency.minutes() {
            self.minutes.insert(start + TimeDelta::minutes(offset));
        }
    }

    /// Records every minute of `range`.
    pub fn insert_range(&mut self, range: TimeRange) {
        for (timestamp, frequency) in decompose(range) {
            self.insert(timestamp, frequency);
        }
    }

    /// Returns true if the minute containing `timestamp` is covered.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.minutes.contains(&floor(timestamp, Step::MINUTE))
    }

    /// Returns the number of covered minutes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.minutes.len()
    }

    /// Returns true if nothing is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.minutes.is_empty()
    }

    /// Returns the covered minutes intersecting `range`, ascending.
    pub fn iter_within(&self, range: TimeRange) -> impl DoubleEndedIterator<Item = DateTime<Utc>> {
        self.minutes
            .range(floor(range.start(), Step::MINUTE)..range.end())
            .copied()
    }

    /// Returns a copy narrowed to the minutes intersecting `range`.
    #[must_use]
    pub fn within(&self, range: TimeRange) -> Self {
        Self {
            minutes: self.iter_within(range).collect(),
        }
    }

    /// Returns all covered minutes, ascending.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = DateTime<Utc>> {
        self.minutes.iter().copied()
    }
}

impl FromIterator<(DateTime<Utc>, Frequency)> for ExistingIndex {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, Frequency)>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl Extend<(DateTime<Utc>, Frequency)> for ExistingIndex {
    fn extend<I: IntoIterator<Item = (DateTime<Utc>, Frequency)>>(&mut self, iter: I) {
        for (timestamp, frequency) in iter {
            self.insert(timestamp, frequency);
        }
    }
}

/// Minutes a range expects to find in an index.
fn expected_minutes(range: TimeRange) -> usize {
    let first = floor(range.start(), Step::MINUTE);
    let span = range.end() - first;
    let whole = span.num_minutes();
    let partial = i64::from(span - TimeDelta::minutes(whole) > TimeDelta::zero());
    (whole + partial) as usize
}

/// Returns true if every minute of `range` is present in `existing`.
///
/// A coarse range counts as covered only when all of the minutes it expands
/// into are accounted for.
#[must_use]
pub fn has_timestamps(range: TimeRange, existing: &ExistingIndex) -> bool {
    existing.iter_within(range).count() == expected_minutes(range)
}

/// Returns the maximal sub-intervals of `range` that `existing` does not cover.
///
/// Adjacent missing minutes merge into one interval. Intervals come out in
/// the requested direction, each forward oriented.
pub fn iter_missing(
    range: TimeRange,
    existing: &ExistingIndex,
    direction: Direction,
) -> std::vec::IntoIter<TimeRange> {
    let mut missing = Vec::new();
    let mut cursor = range.start();

    for minute in existing.iter_within(range) {
        if minute > cursor {
            missing.extend(TimeRange::try_new(cursor, minute));
        }
        cursor = cursor.max(minute + TimeDelta::minutes(1));
    }
    missing.extend(TimeRange::try_new(cursor, range.end()));

    if direction.is_reverse() {
        missing.reverse();
    }
    missing.into_iter()
}

/// Splits a range into maximal aligned day, hour and minute catalog entries.
///
/// The range is widened to whole minutes first.
#[must_use]
pub fn decompose(range: TimeRange) -> Vec<(DateTime<Utc>, Frequency)> {
    let mut entries = Vec::new();
    let mut cursor = floor(range.start(), Step::MINUTE);
    let end = crate::ceil(range.end(), Step::MINUTE);

    while cursor < end {
        let frequency = Frequency::all()
            .iter()
            .copied()
            .find(|f| {
                floor(cursor, f.step()) == cursor && cursor + f.step().duration() <= end
            })
            .unwrap_or(Frequency::Minute);
        entries.push((cursor, frequency));
        cursor += frequency.step().duration();
    }
    entries
}
