//! Gap-aware traversal of a requested range.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use ticksmith_calendar::{
    Direction, ExistingIndex, Partition, floor, has_timestamps, iter_timeframe, refine_all,
};
use ticksmith_types::{Frequency, Step, TimeRange};

use crate::{AggregationTarget, Result, TradeStore};

/// Returns the current time floored to the minute.
///
/// Work never extends past this instant, so the minute still being traded is
/// left for a later run.
#[must_use]
pub fn default_max_timestamp_to() -> DateTime<Utc> {
    floor(Utc::now(), Step::MINUTE)
}

/// Yields the sub-intervals of a range that still need work.
///
/// Implementors supply what "already computed" means for their domain; the
/// provided [`TimeFrameIterator::iter_all`] does the partitioning and
/// refinement.
pub trait TimeFrameIterator {
    /// Order in which coarse chunks and work items are produced.
    const DIRECTION: Direction;

    /// Returns the computed instants inside `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog lookup fails.
    fn get_existing(&mut self, range: TimeRange, retry: bool) -> Result<ExistingIndex>;

    /// Returns false to skip a chunk that cannot be computed yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the readiness lookup fails.
    fn can_iter(&mut self, _range: TimeRange) -> Result<bool> {
        Ok(true)
    }

    /// Returns the instant no work item may extend past.
    fn max_timestamp_to(&self) -> DateTime<Utc> {
        default_max_timestamp_to()
    }

    /// Walks `range` in chunks of `step`, yielding the missing sub-intervals.
    fn iter_all(&mut self, range: TimeRange, step: Step, retry: bool) -> FrameWalk<'_, Self>
    where
        Self: Sized,
    {
        let max_to = self.max_timestamp_to();
        FrameWalk {
            chunks: iter_timeframe(range.start(), range.end(), step, Self::DIRECTION),
            level: Frequency::for_step(step),
            retry,
            max_to,
            pending: VecDeque::new(),
            vetoed: 0,
            failed: false,
            iterator: self,
        }
    }
}

/// Lazy walk produced by [`TimeFrameIterator::iter_all`].
///
/// Each coarse chunk is looked up only when the work items of the previous
/// one are used up. A lookup failure is yielded once and ends the walk.
#[derive(Debug)]
pub struct FrameWalk<'a, I> {
    iterator: &'a mut I,
    chunks: Partition,
    level: Frequency,
    retry: bool,
    max_to: DateTime<Utc>,
    pending: VecDeque<TimeRange>,
    vetoed: usize,
    failed: bool,
}

impl<I: TimeFrameIterator> FrameWalk<'_, I> {
    /// Returns the number of chunks skipped because they were not ready.
    #[must_use]
    pub const fn vetoed(&self) -> usize {
        self.vetoed
    }

    fn fill(&mut self, chunk: TimeRange) -> Result<()> {
        let Some(chunk) = chunk.clamp_end(self.max_to) else {
            return Ok(());
        };

        let existing = self.iterator.get_existing(chunk, self.retry)?;
        if has_timestamps(chunk, &existing) {
            return Ok(());
        }
        if !self.iterator.can_iter(chunk)? {
            tracing::debug!(%chunk, "chunk not ready, skipping");
            self.vetoed += 1;
            return Ok(());
        }

        self.pending
            .extend(refine_all(self.level, chunk, &existing, I::DIRECTION));
        Ok(())
    }
}

impl<I: TimeFrameIterator> Iterator for FrameWalk<'_, I> {
    type Item = Result<TimeRange>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(Ok(item));
            }
            if self.failed {
                return None;
            }
            let chunk = self.chunks.next()?;
            if let Err(err) = self.fill(chunk) {
                self.failed = true;
                return Some(Err(err));
            }
        }
    }
}

/// Forward traversal over a derived candle cache.
///
/// Existing instants come from the target's own cache catalog and chunks are
/// gated on the target's readiness predicate. With `purge_on_retry`, a retry
/// deletes the chunk's previous output and recomputes it from scratch.
#[derive(Debug)]
pub struct CandleCacheIterator<'a, T> {
    target: &'a mut T,
    purge_on_retry: bool,
    max_to: Option<DateTime<Utc>>,
}

impl<'a, T: AggregationTarget> CandleCacheIterator<'a, T> {
    /// Creates an iterator over `target`'s cache.
    #[must_use]
    pub const fn new(target: &'a mut T, purge_on_retry: bool) -> Self {
        Self {
            target,
            purge_on_retry,
            max_to: None,
        }
    }

    /// Overrides the instant work may not extend past.
    #[must_use]
    pub const fn with_max_timestamp_to(mut self, max_to: DateTime<Utc>) -> Self {
        self.max_to = Some(max_to);
        self
    }
}

impl<T: AggregationTarget> TimeFrameIterator for CandleCacheIterator<'_, T> {
    const DIRECTION: Direction = Direction::Forward;

    fn get_existing(&mut self, range: TimeRange, retry: bool) -> Result<ExistingIndex> {
        if retry && self.purge_on_retry {
            tracing::info!(dataset = self.target.name(), %range, "purging previous output");
            self.target.purge(range)?;
            return Ok(ExistingIndex::new());
        }
        self.target.get_existing(range)
    }

    fn can_iter(&mut self, range: TimeRange) -> Result<bool> {
        self.target.can_aggregate(range)
    }

    fn max_timestamp_to(&self) -> DateTime<Utc> {
        self.max_to.unwrap_or_else(default_max_timestamp_to)
    }
}

/// Reverse traversal over the raw trade catalog of one symbol.
///
/// With `retry`, records flagged as incomplete count as missing.
#[derive(Debug)]
pub struct TradeDataIterator<'a, S> {
    store: &'a S,
    symbol: &'a str,
    max_to: Option<DateTime<Utc>>,
}

impl<'a, S: TradeStore> TradeDataIterator<'a, S> {
    /// Creates an iterator over `symbol`'s trade catalog.
    #[must_use]
    pub const fn new(store: &'a S, symbol: &'a str) -> Self {
        Self {
            store,
            symbol,
            max_to: None,
        }
    }

    /// Overrides the instant work may not extend past.
    #[must_use]
    pub const fn with_max_timestamp_to(mut self, max_to: DateTime<Utc>) -> Self {
        self.max_to = Some(max_to);
        self
    }
}

impl<S: TradeStore> TimeFrameIterator for TradeDataIterator<'_, S> {
    const DIRECTION: Direction = Direction::Reverse;

    fn get_existing(&mut self, range: TimeRange, retry: bool) -> Result<ExistingIndex> {
        Ok(self
            .store
            .existing_trades(self.symbol, range, retry)?
            .into_iter()
            .collect())
    }

    fn max_timestamp_to(&self) -> DateTime<Utc> {
        self.max_to.unwrap_or_else(default_max_timestamp_to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    use crate::{MemoryStore, PipelineError, StoreError, TradeSlice};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    fn range(from: DateTime<Utc>, to: DateTime<Utc>) -> TimeRange {
        TimeRange::new(from, to).unwrap()
    }

    /// Iterator over a fixed index, gating chunks that start in a vetoed set.
    struct Fixed {
        existing: ExistingIndex,
        vetoed: Vec<DateTime<Utc>>,
        max_to: DateTime<Utc>,
        lookups: usize,
    }

    impl Fixed {
        fn new(existing: ExistingIndex) -> Self {
            Self {
                existing,
                vetoed: Vec::new(),
                max_to: at(31, 0, 0),
                lookups: 0,
            }
        }
    }

    impl TimeFrameIterator for Fixed {
        const DIRECTION: Direction = Direction::Forward;

        fn get_existing(&mut self, range: TimeRange, _retry: bool) -> Result<ExistingIndex> {
            self.lookups += 1;
            Ok(self.existing.within(range))
        }

        fn can_iter(&mut self, range: TimeRange) -> Result<bool> {
            Ok(!self.vetoed.contains(&range.start()))
        }

        fn max_timestamp_to(&self) -> DateTime<Utc> {
            self.max_to
        }
    }

    fn collect<I: TimeFrameIterator>(iterator: &mut I, r: TimeRange) -> Vec<TimeRange> {
        iterator
            .iter_all(r, Step::DAY, false)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_empty_catalog_yields_hours() {
        let mut iterator = Fixed::new(ExistingIndex::new());
        let work = collect(&mut iterator, range(at(1, 0, 0), at(3, 0, 0)));
        // Empty days refine into one item per hour.
        assert_eq!(work.len(), 48);
        assert_eq!(work[0], range(at(1, 0, 0), at(1, 1, 0)));
        assert_eq!(work[47], range(at(2, 23, 0), at(3, 0, 0)));
    }

    #[test]
    fn test_covered_chunks_skipped() {
        let mut existing = ExistingIndex::new();
        existing.insert(at(1, 0, 0), Frequency::Day);
        existing.insert(at(2, 0, 0), Frequency::Hour);
        existing.insert(at(2, 1, 0), Frequency::Minute);

        let mut iterator = Fixed::new(existing);
        let work = collect(&mut iterator, range(at(1, 0, 0), at(2, 3, 0)));
        assert_eq!(
            work,
            vec![
                range(at(2, 1, 1), at(2, 2, 0)),
                range(at(2, 2, 0), at(2, 3, 0)),
            ]
        );
    }

    #[test]
    fn test_coverage_completeness() {
        let mut existing = ExistingIndex::new();
        for minute in [0, 1, 2, 30, 59] {
            existing.insert(at(1, 5, minute), Frequency::Minute);
        }
        existing.insert(at(1, 9, 0), Frequency::Hour);
        let full = range(at(1, 4, 0), at(1, 12, 0));

        let mut iterator = Fixed::new(existing.clone());
        let work = collect(&mut iterator, full);

        let mut union = existing.within(full);
        let mut total = union.len();
        for item in &work {
            assert!(full.covers(item));
            for (timestamp, frequency) in ticksmith_calendar::decompose(*item) {
                assert!(!union.contains(timestamp), "overlap at {timestamp}");
                union.insert(timestamp, frequency);
            }
            total += item.total_minutes() as usize;
        }
        assert_eq!(total, full.total_minutes() as usize);
        assert!(has_timestamps(full, &union));
    }

    #[test]
    fn test_veto_skips_chunk() {
        let mut iterator = Fixed::new(ExistingIndex::new());
        iterator.vetoed.push(at(1, 0, 0));
        let r = range(at(1, 0, 0), at(3, 0, 0));

        let mut walk = iterator.iter_all(r, Step::DAY, false);
        let work = walk.by_ref().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(walk.vetoed(), 1);
        assert!(work.iter().all(|item| item.start() >= at(2, 0, 0)));
    }

    #[test]
    fn test_clamped_to_max_timestamp() {
        let mut iterator = Fixed::new(ExistingIndex::new());
        iterator.max_to = at(1, 0, 30);
        let work = collect(&mut iterator, range(at(1, 0, 0), at(3, 0, 0)));
        assert_eq!(work, vec![range(at(1, 0, 0), at(1, 0, 30))]);
        // Chunks entirely past the limit are never looked up.
        assert_eq!(iterator.lookups, 1);
    }

    #[test]
    fn test_lazy_lookup() {
        let mut iterator = Fixed::new(ExistingIndex::new());
        let first = iterator
            .iter_all(range(at(1, 0, 0), at(5, 0, 0)), Step::DAY, false)
            .next();
        assert!(first.is_some());
        assert_eq!(iterator.lookups, 1);
    }

    #[test]
    fn test_reverse_vs_forward_order() {
        let r = range(at(1, 0, 0), at(3, 0, 0));
        let mut store = MemoryStore::new();
        store
            .write_trades("BTC", &TradeSlice::new(range(at(1, 6, 0), at(2, 6, 0)), true))
            .unwrap();

        let mut backfill =
            TradeDataIterator::new(&store, "BTC").with_max_timestamp_to(at(31, 0, 0));
        let reverse = collect(&mut backfill, r);
        assert!(reverse.len() > 2);
        assert!(reverse.windows(2).all(|pair| pair[1].end() <= pair[0].start()));

        let mut existing = ExistingIndex::new();
        existing.insert_range(range(at(1, 6, 0), at(2, 6, 0)));
        let mut append = Fixed::new(existing);
        let forward = collect(&mut append, r);
        assert!(forward.windows(2).all(|pair| pair[0].end() <= pair[1].start()));

        let mut reversed = reverse.clone();
        reversed.reverse();
        assert_eq!(reversed, forward);
    }

    #[test]
    fn test_retry_refetches_incomplete() {
        let r = range(at(1, 0, 0), at(1, 1, 0));
        let mut store = MemoryStore::new();
        store.write_trades("BTC", &TradeSlice::new(r, false)).unwrap();

        let mut iterator =
            TradeDataIterator::new(&store, "BTC").with_max_timestamp_to(at(31, 0, 0));
        assert!(collect(&mut iterator, r).is_empty());

        let work = iterator
            .iter_all(r, Step::DAY, true)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(work, vec![r]);
    }

    #[test]
    fn test_lookup_failure_ends_walk() {
        let mut store = MemoryStore::new();
        store.set_unavailable(true);
        let mut iterator =
            TradeDataIterator::new(&store, "BTC").with_max_timestamp_to(at(31, 0, 0));
        let mut walk = iterator.iter_all(range(at(1, 0, 0), at(3, 0, 0)), Step::DAY, false);
        assert!(matches!(
            walk.next(),
            Some(Err(PipelineError::Store(StoreError::Unavailable(_))))
        ));
        assert!(walk.next().is_none());
    }

    #[test]
    fn test_default_max_timestamp_is_past_minute() {
        let max_to = default_max_timestamp_to();
        assert!(max_to <= Utc::now());
        assert!(Utc::now() - max_to < TimeDelta::minutes(1) + TimeDelta::seconds(1));
        assert_eq!(max_to, floor(max_to, Step::MINUTE));
    }
}
