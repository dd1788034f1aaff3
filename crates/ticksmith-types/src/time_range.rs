//! Half-open time ranges.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Step, TimeRangeError};

/// A half-open `[start, end)` interval of UTC instants.
///
/// The constructor guarantees `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds", into = "RangeBounds")]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new range, validating that start < end.
    ///
    /// # Errors
    ///
    /// Returns an error if start >= end.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeRangeError> {
        if start == end {
            return Err(TimeRangeError::Empty { at: start });
        }
        if start > end {
            return Err(TimeRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range, returning `None` when it would be empty or inverted.
    #[must_use]
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Creates a range of the given length starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if `length` is not positive.
    pub fn starting_at(start: DateTime<Utc>, length: TimeDelta) -> Result<Self, TimeRangeError> {
        Self::new(start, start + length)
    }

    /// Returns the inclusive start.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the exclusive end.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns the length of the range.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Returns the length of the range in whole minutes.
    #[must_use]
    pub fn total_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Returns true if both bounds fall on boundaries of `step`.
    #[must_use]
    pub fn is_aligned(&self, step: Step) -> bool {
        on_boundary(self.start, step) && on_boundary(self.end, step)
    }

    /// Returns true if `timestamp` lies in `[start, end)`.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Returns true if `other` lies entirely inside this range.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Returns the overlap of two ranges, if any.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        Self::try_new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Returns the range with its end capped at `max_end`, or `None` if nothing remains.
    #[must_use]
    pub fn clamp_end(&self, max_end: DateTime<Utc>) -> Option<Self> {
        Self::try_new(self.start, self.end.min(max_end))
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

fn on_boundary(timestamp: DateTime<Utc>, step: Step) -> bool {
    timestamp.timestamp_subsec_nanos() == 0
        && timestamp.timestamp().rem_euclid(step.minutes() * 60) == 0
}

/// Serialized form of a [`TimeRange`], validated on the way back in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RangeBounds {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RangeBounds> for TimeRange {
    type Error = TimeRangeError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl From<TimeRange> for RangeBounds {
    fn from(range: TimeRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_time_range_new() {
        let range = TimeRange::new(at(0, 0), at(1, 0)).unwrap();
        assert_eq!(range.start(), at(0, 0));
        assert_eq!(range.end(), at(1, 0));
        assert_eq!(range.total_minutes(), 60);
    }

    #[test]
    fn test_time_range_invalid() {
        assert!(matches!(
            TimeRange::new(at(1, 0), at(1, 0)),
            Err(TimeRangeError::Empty { .. })
        ));
        assert!(matches!(
            TimeRange::new(at(2, 0), at(1, 0)),
            Err(TimeRangeError::Inverted { .. })
        ));
        assert!(TimeRange::try_new(at(2, 0), at(1, 0)).is_none());
    }

    #[test]
    fn test_contains_is_half_open() {
        let range = TimeRange::new(at(0, 0), at(0, 1)).unwrap();
        assert!(range.contains(at(0, 0)));
        assert!(!range.contains(at(0, 1)));
    }

    #[test]
    fn test_intersect_and_clamp() {
        let a = TimeRange::new(at(0, 0), at(2, 0)).unwrap();
        let b = TimeRange::new(at(1, 0), at(3, 0)).unwrap();
        assert_eq!(
            a.intersect(&b),
            Some(TimeRange::new(at(1, 0), at(2, 0)).unwrap())
        );
        assert_eq!(
            a.clamp_end(at(0, 30)),
            Some(TimeRange::new(at(0, 0), at(0, 30)).unwrap())
        );
        assert_eq!(a.clamp_end(at(0, 0)), None);
        assert!(a.covers(&TimeRange::new(at(0, 30), at(1, 0)).unwrap()));
    }

    #[test]
    fn test_is_aligned() {
        let range = TimeRange::new(at(1, 0), at(3, 0)).unwrap();
        assert!(range.is_aligned(Step::HOUR));
        assert!(!range.is_aligned(Step::DAY));
        let range = TimeRange::new(at(1, 5), at(1, 10)).unwrap();
        assert!(range.is_aligned("5t".parse().unwrap()));
        assert!(!range.is_aligned(Step::HOUR));
    }

    #[test]
    fn test_deserialize_rejects_inverted() {
        let json = r#"{"start":"2024-01-01T02:00:00Z","end":"2024-01-01T01:00:00Z"}"#;
        assert!(serde_json::from_str::<TimeRange>(json).is_err());
    }
}
