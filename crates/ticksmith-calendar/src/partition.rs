//! Calendar-aligned range partitioning.

use chrono::{DateTime, TimeDelta, Utc};
use ticksmith_types::{Step, TimeRange};

/// Traversal direction of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Oldest chunk first.
    #[default]
    Forward,
    /// Newest chunk first.
    Reverse,
}

impl Direction {
    /// Returns true for reverse traversal.
    #[must_use]
    pub const fn is_reverse(&self) -> bool {
        matches!(self, Self::Reverse)
    }
}

/// Truncates a timestamp to the start of its step boundary.
///
/// Minute and hour steps align within the UTC day, day steps count whole days
/// from the Unix epoch. Sub-minute precision is dropped.
#[must_use]
pub fn floor(timestamp: DateTime<Utc>, step: Step) -> DateTime<Utc> {
    let minutes = timestamp.timestamp().div_euclid(60);
    let aligned = minutes - minutes.rem_euclid(step.minutes());
    DateTime::<Utc>::UNIX_EPOCH + TimeDelta::minutes(aligned)
}

/// Rounds a timestamp up to the next step boundary, unless already on one.
#[must_use]
pub fn ceil(timestamp: DateTime<Utc>, step: Step) -> DateTime<Utc> {
    let floored = floor(timestamp, step);
    if floored == timestamp {
        floored
    } else {
        floored + step.duration()
    }
}

/// Returns the first step boundary strictly after `timestamp`.
#[must_use]
pub fn next_boundary(timestamp: DateTime<Utc>, step: Step) -> DateTime<Utc> {
    floor(timestamp, step) + step.duration()
}

/// Returns the last step boundary strictly before `timestamp`.
fn previous_boundary(timestamp: DateTime<Utc>, step: Step) -> DateTime<Utc> {
    let floored = floor(timestamp, step);
    if floored == timestamp {
        floored - step.duration()
    } else {
        floored
    }
}

/// Lazy iterator over calendar-aligned chunks of a range.
///
/// Interior chunk boundaries fall on step boundaries; the first and last
/// chunks are clipped to the range. Every chunk is forward oriented
/// (`start < end`) regardless of traversal direction.
#[derive(Debug, Clone)]
pub struct Partition {
    front: DateTime<Utc>,
    back: DateTime<Utc>,
    step: Step,
    direction: Direction,
}

impl Partition {
    /// Creates a partition of `[from, to)`. A degenerate range yields nothing.
    #[must_use]
    pub const fn new(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        step: Step,
        direction: Direction,
    ) -> Self {
        Self {
            front: from,
            back: to,
            step,
            direction,
        }
    }

    fn take_front(&mut self) -> Option<TimeRange> {
        if self.front >= self.back {
            return None;
        }
        let end = next_boundary(self.front, self.step).min(self.back);
        let chunk = TimeRange::try_new(self.front, end)?;
        self.front = end;
        Some(chunk)
    }

    fn take_back(&mut self) -> Option<TimeRange> {
        if self.front >= self.back {
            return None;
        }
        let start = previous_boundary(self.back, self.step).max(self.front);
        let chunk = TimeRange::try_new(start, self.back)?;
        self.back = start;
        Some(chunk)
    }
}

impl Iterator for Partition {
    type Item = TimeRange;

    fn next(&mut self) -> Option<Self::Item> {
        match self.direction {
            Direction::Forward => self.take_front(),
            Direction::Reverse => self.take_back(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.front >= self.back {
            return (0, Some(0));
        }
        let span = ceil(self.back, self.step) - floor(self.front, self.step);
        let chunks = (span.num_minutes() / self.step.minutes()) as usize;
        (chunks, Some(chunks))
    }
}

impl DoubleEndedIterator for Partition {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self.direction {
            Direction::Forward => self.take_back(),
            Direction::Reverse => self.take_front(),
        }
    }
}

impl ExactSizeIterator for Partition {}

/// Splits `[from, to)` into calendar-aligned chunks of `step`.
pub const fn iter_timeframe(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    step: Step,
    direction: Direction,
) -> Partition {
    Partition::new(from, to, step, direction)
}

/// Splits a range into forward windows of `step`.
pub const fn iter_window(range: TimeRange, step: Step) -> Partition {
    Partition::new(range.start(), range.end(), step, Direction::Forward)
}

/// Yields the whole range as a single window.
pub fn iter_once(range: TimeRange) -> std::iter::Once<TimeRange> {
    std::iter::once(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_floor_and_ceil() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 14, 37, 45).unwrap();
        assert_eq!(floor(dt, Step::MINUTE).minute(), 37);
        assert_eq!(floor(dt, Step::MINUTE).second(), 0);
        assert_eq!(floor(dt, "5t".parse().unwrap()).minute(), 35);
        assert_eq!(floor(dt, "15t".parse().unwrap()).minute(), 30);
        assert_eq!(floor(dt, "4h".parse().unwrap()).hour(), 12);
        assert_eq!(floor(dt, Step::DAY), at(15, 0, 0));
        assert_eq!(ceil(dt, Step::HOUR), Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap());
        assert_eq!(ceil(at(15, 0, 0), Step::DAY), at(15, 0, 0));
        assert_eq!(next_boundary(at(15, 0, 0), Step::DAY), at(16, 0, 0));
    }

    #[test]
    fn test_daily_partition() {
        let chunks: Vec<_> = iter_timeframe(at(1, 0, 0), at(4, 0, 0), Step::DAY, Direction::Forward)
            .collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start(), at(1, 0, 0));
        assert_eq!(chunks[2].end(), at(4, 0, 0));
    }

    #[test]
    fn test_unaligned_edges_are_clipped() {
        let chunks: Vec<_> =
            iter_timeframe(at(1, 22, 30), at(2, 1, 15), Step::HOUR, Direction::Forward).collect();
        let bounds: Vec<_> = chunks.iter().map(|c| (c.start(), c.end())).collect();
        assert_eq!(
            bounds,
            vec![
                (at(1, 22, 30), at(1, 23, 0)),
                (at(1, 23, 0), at(2, 0, 0)),
                (at(2, 0, 0), at(2, 1, 0)),
                (at(2, 1, 0), at(2, 1, 15)),
            ]
        );
    }

    #[test]
    fn test_reverse_partition() {
        let forward: Vec<_> =
            iter_timeframe(at(1, 22, 30), at(2, 1, 15), Step::HOUR, Direction::Forward).collect();
        let mut reverse: Vec<_> =
            iter_timeframe(at(1, 22, 30), at(2, 1, 15), Step::HOUR, Direction::Reverse).collect();
        assert!(reverse.windows(2).all(|w| w[0].start() > w[1].start()));
        assert!(reverse.iter().all(|c| c.start() < c.end()));
        reverse.reverse();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_degenerate_range_is_empty() {
        assert_eq!(
            iter_timeframe(at(1, 0, 0), at(1, 0, 0), Step::DAY, Direction::Forward).count(),
            0
        );
        assert_eq!(
            iter_timeframe(at(2, 0, 0), at(1, 0, 0), Step::DAY, Direction::Reverse).count(),
            0
        );
    }

    #[test]
    fn test_exact_size() {
        let partition = iter_timeframe(at(1, 0, 0), at(1, 1, 0), Step::MINUTE, Direction::Forward);
        assert_eq!(partition.len(), 60);
        let partition = iter_timeframe(at(1, 22, 30), at(2, 1, 15), Step::HOUR, Direction::Reverse);
        assert_eq!(partition.len(), 4);
    }

    #[test]
    fn test_double_ended() {
        let mut partition =
            iter_timeframe(at(1, 0, 0), at(1, 0, 3), Step::MINUTE, Direction::Forward);
        assert_eq!(partition.next_back().unwrap().start(), at(1, 0, 2));
        assert_eq!(partition.next().unwrap().start(), at(1, 0, 0));
        assert_eq!(partition.next().unwrap().start(), at(1, 0, 1));
        assert!(partition.next().is_none());
    }

    #[test]
    fn test_iter_once_and_window() {
        let range = TimeRange::new(at(1, 0, 0), at(1, 0, 10)).unwrap();
        assert_eq!(iter_once(range).count(), 1);
        assert_eq!(iter_window(range, "5t".parse().unwrap()).count(), 2);
    }
}
