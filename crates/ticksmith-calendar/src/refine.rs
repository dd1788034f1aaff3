//! Day to hour to minute refinement of incomplete chunks.

use ticksmith_types::{Frequency, TimeRange};

use crate::{Direction, ExistingIndex, has_timestamps, iter_missing, iter_timeframe};

/// Outcome of refining one chunk by one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refined {
    /// Incomplete sub-chunk to refine further at the given level.
    Descend(Frequency, TimeRange),
    /// Final work item.
    Emit(TimeRange),
}

/// Refines an incomplete chunk at `level` into next-level work.
///
/// Day chunks split into their incomplete hours. Hour and minute chunks
/// yield the merged missing minute runs directly.
#[must_use]
pub fn refine(
    level: Frequency,
    range: TimeRange,
    existing: &ExistingIndex,
    direction: Direction,
) -> Vec<Refined> {
    match level {
        Frequency::Day => {
            iter_timeframe(range.start(), range.end(), Frequency::Hour.step(), direction)
                .filter(|hour| !has_timestamps(*hour, existing))
                .map(|hour| Refined::Descend(Frequency::Hour, hour))
                .collect()
        }
        Frequency::Hour | Frequency::Minute => iter_missing(range, existing, direction)
            .map(Refined::Emit)
            .collect(),
    }
}

/// Refines a chunk all the way down, returning final work items in order.
#[must_use]
pub fn refine_all(
    level: Frequency,
    range: TimeRange,
    existing: &ExistingIndex,
    direction: Direction,
) -> Vec<TimeRange> {
    if has_timestamps(range, existing) {
        return Vec::new();
    }

    let mut work = Vec::new();
    let mut stack = vec![Refined::Descend(level, range)];

    while let Some(next) = stack.pop() {
        match next {
            Refined::Emit(item) => work.push(item),
            Refined::Descend(level, range) => {
                // Reversed so the first item is popped first.
                stack.extend(refine(level, range, existing, direction).into_iter().rev());
            }
        }
    }
    work
}
