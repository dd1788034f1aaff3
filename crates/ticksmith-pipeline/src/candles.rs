//! Candle targets built from stored trades.

use chrono::{DateTime, Utc};
use ticksmith_aggregate::{
    AggregateError, AggregatedTrade, Candle, CandleAggregator, SampleType, ThresholdAggregator,
    Trade, ensure_sorted, filter_by_timestamp,
};
use ticksmith_calendar::{ExistingIndex, floor, has_timestamps, iter_window};
use ticksmith_types::{Step, TimeRange};

use crate::{
    AdaptiveThreshold, AggregationTarget, CacheRecord, CacheState, CandleData, CandleStore,
    DailyTarget, Initialized, PipelineError, Result, TradeStore, trade_summary_name,
};

/// Store access shared by the candle targets.
#[derive(Debug)]
struct CandleSource<'a, S> {
    store: &'a mut S,
    symbol: String,
    name: String,
}

impl<S: TradeStore + CandleStore> CandleSource<'_, S> {
    fn persisted(&self, end: DateTime<Utc>) -> Result<Option<CacheState>> {
        Ok(self
            .store
            .read_cache(&self.name, end)?
            .map(|record| record.state))
    }

    fn get_existing(&self, range: TimeRange) -> Result<ExistingIndex> {
        Ok(self
            .store
            .existing_cache(&self.name, range)?
            .into_iter()
            .collect())
    }

    /// Trades are ready once every minute of the chunk has a complete record.
    fn trades_ready(&self, range: TimeRange) -> Result<bool> {
        let existing: ExistingIndex = self
            .store
            .existing_trades(&self.symbol, range, true)?
            .into_iter()
            .collect();
        Ok(has_timestamps(range, &existing))
    }

    fn load_trades(&self, range: TimeRange) -> Result<Vec<AggregatedTrade>> {
        let trades: Vec<_> = self
            .store
            .read_trades(&self.symbol, range)?
            .iter()
            .flat_map(|record| record.trades())
            .collect();
        let mut rows = filter_by_timestamp(&trades, range);
        rows.sort_by_key(Trade::sort_key);
        Ok(rows)
    }

    /// Summaries of `window`, once the summary dataset has committed all of it.
    fn summaries(&self, window: TimeRange) -> Result<Option<Vec<Candle>>> {
        let name = trade_summary_name(&self.symbol);
        let existing: ExistingIndex = self
            .store
            .existing_cache(&name, window)?
            .into_iter()
            .collect();
        if !has_timestamps(window, &existing) {
            return Ok(None);
        }
        Ok(Some(self.store.read_candles(&name, window)?))
    }

    fn write_cache(&mut self, record: &CacheRecord) -> Result<()> {
        Ok(self.store.write_cache(&self.name, record)?)
    }

    fn write_candles(&mut self, range: TimeRange, candles: Vec<Candle>) -> Result<()> {
        Ok(self
            .store
            .write_candles(&self.name, &CandleData { range, candles })?)
    }

    fn purge(&mut self, range: TimeRange) -> Result<()> {
        Ok(self.store.purge(&self.name, range)?)
    }
}

/// Calendar-aligned candles of a fixed window.
///
/// The window still open at the end of a chunk is carried to the next one.
#[derive(Debug)]
pub struct TimeCandleTarget<'a, S> {
    source: CandleSource<'a, S>,
    window: Step,
}

impl<'a, S: TradeStore + CandleStore> TimeCandleTarget<'a, S> {
    /// Creates a target writing `window` candles of `symbol` under `name`.
    #[must_use]
    pub fn new(
        store: &'a mut S,
        symbol: impl Into<String>,
        name: impl Into<String>,
        window: Step,
    ) -> Self {
        Self {
            source: CandleSource {
                store,
                symbol: symbol.into(),
                name: name.into(),
            },
            window,
        }
    }

    /// Creates the daily trade summary target of `symbol`.
    ///
    /// Summaries are one-day candles stored under [`trade_summary_name`];
    /// [`AdaptiveCandleTarget`] sizes its candles from them.
    #[must_use]
    pub fn trade_summary(store: &'a mut S, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let name = trade_summary_name(&symbol);
        Self::new(store, symbol, name, Step::DAY)
    }

    /// Returns the candle window.
    #[must_use]
    pub const fn window(&self) -> Step {
        self.window
    }
}

impl<S: TradeStore + CandleStore> AggregationTarget for TimeCandleTarget<'_, S> {
    type Row = AggregatedTrade;
    type Output = Candle;

    fn name(&self) -> &str {
        &self.source.name
    }

    /// Widens the start to the enclosing window so the first candle is whole.
    fn initialize(&mut self, range: TimeRange, _retry: bool) -> Result<Initialized> {
        let range = TimeRange::new(floor(range.start(), self.window), range.end())?;
        let cache = self
            .source
            .persisted(range.start())?
            .unwrap_or(CacheState::TimeCandle { pending: None });
        Ok(Initialized { range, cache })
    }

    fn get_existing(&mut self, range: TimeRange) -> Result<ExistingIndex> {
        self.source.get_existing(range)
    }

    fn purge(&mut self, range: TimeRange) -> Result<()> {
        self.source.purge(range)
    }

    fn can_aggregate(&mut self, range: TimeRange) -> Result<bool> {
        self.source.trades_ready(range)
    }

    fn get_data_frame(&mut self, range: TimeRange) -> Result<Vec<AggregatedTrade>> {
        self.source.load_trades(range)
    }

    fn get_cache(&mut self, chunk_from: DateTime<Utc>, running: CacheState) -> Result<CacheState> {
        Ok(running.merge(self.source.persisted(chunk_from)?))
    }

    fn aggregate(
        &mut self,
        range: TimeRange,
        rows: Vec<AggregatedTrade>,
        cache: CacheState,
    ) -> Result<(Vec<Candle>, CacheState)> {
        ensure_sorted(&rows)?;

        let mut aggregator = CandleAggregator::resume(self.window, cache.pending().copied());
        let mut candles: Vec<_> = rows
            .iter()
            .filter_map(|trade| aggregator.process(trade))
            .collect();
        candles.extend(aggregator.flush_until(range.end()));

        let next = CacheState::TimeCandle {
            pending: aggregator.into_pending(),
        };
        check_volume(&rows, cache, &candles, next)?;
        Ok((candles, next))
    }

    fn write_cache(&mut self, record: &CacheRecord) -> Result<()> {
        self.source.write_cache(record)
    }

    fn write_data(&mut self, range: TimeRange, output: Vec<Candle>) -> Result<()> {
        self.source.write_candles(range, output)
    }
}

/// Candles closing once an accumulated sample value reaches a target.
///
/// With a reset step, the open candle also closes at each reset boundary.
#[derive(Debug)]
pub struct ConstantCandleTarget<'a, S> {
    source: CandleSource<'a, S>,
    sample_type: SampleType,
    target: f64,
    cache_reset: Option<Step>,
}

impl<'a, S: TradeStore + CandleStore> ConstantCandleTarget<'a, S> {
    /// Creates a target writing threshold candles of `symbol` under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is not a positive number.
    pub fn new(
        store: &'a mut S,
        symbol: impl Into<String>,
        name: impl Into<String>,
        sample_type: SampleType,
        target: f64,
    ) -> Result<Self> {
        if target.is_nan() || target <= 0.0 {
            return Err(AggregateError::InvalidThreshold(target).into());
        }
        Ok(Self {
            source: CandleSource {
                store,
                symbol: symbol.into(),
                name: name.into(),
            },
            sample_type,
            target,
            cache_reset: None,
        })
    }

    /// Closes the open candle at every boundary of `reset`.
    #[must_use]
    pub const fn with_cache_reset(mut self, reset: Option<Step>) -> Self {
        self.cache_reset = reset;
        self
    }

    /// Returns the sample type being accumulated.
    #[must_use]
    pub const fn sample_type(&self) -> SampleType {
        self.sample_type
    }
}

impl<S: TradeStore + CandleStore> AggregationTarget for ConstantCandleTarget<'_, S> {
    type Row = AggregatedTrade;
    type Output = Candle;

    fn name(&self) -> &str {
        &self.source.name
    }

    fn initialize(&mut self, range: TimeRange, _retry: bool) -> Result<Initialized> {
        let cache = self
            .source
            .persisted(range.start())?
            .unwrap_or(CacheState::ConstantCandle { pending: None });
        Ok(Initialized { range, cache })
    }

    fn get_existing(&mut self, range: TimeRange) -> Result<ExistingIndex> {
        self.source.get_existing(range)
    }

    fn purge(&mut self, range: TimeRange) -> Result<()> {
        self.source.purge(range)
    }

    fn can_aggregate(&mut self, range: TimeRange) -> Result<bool> {
        self.source.trades_ready(range)
    }

    fn get_data_frame(&mut self, range: TimeRange) -> Result<Vec<AggregatedTrade>> {
        self.source.load_trades(range)
    }

    fn get_cache(&mut self, chunk_from: DateTime<Utc>, running: CacheState) -> Result<CacheState> {
        Ok(running.merge(self.source.persisted(chunk_from)?))
    }

    fn aggregate(
        &mut self,
        range: TimeRange,
        rows: Vec<AggregatedTrade>,
        cache: CacheState,
    ) -> Result<(Vec<Candle>, CacheState)> {
        ensure_sorted(&rows)?;

        let mut aggregator = ThresholdAggregator::new(self.sample_type, self.target)
            .with_reset(self.cache_reset)
            .with_pending(cache.pending().copied());
        let mut candles = Vec::new();
        for trade in &rows {
            aggregator.process(trade, &mut candles);
        }
        candles.extend(aggregator.roll(range.end()));

        let next = CacheState::ConstantCandle {
            pending: aggregator.into_pending(),
        };
        check_volume(&rows, cache, &candles, next)?;
        Ok((candles, next))
    }

    fn write_cache(&mut self, record: &CacheRecord) -> Result<()> {
        self.source.write_cache(record)
    }

    fn write_data(&mut self, range: TimeRange, output: Vec<Candle>) -> Result<()> {
        self.source.write_candles(range, output)
    }
}

/// Threshold candles sized from a moving average of daily trade summaries.
///
/// The threshold is computed once per UTC day and carried in the cache state.
/// A chunk is ready once its trades and the summaries of the days before it
/// are.
#[derive(Debug)]
pub struct AdaptiveCandleTarget<'a, S> {
    source: CandleSource<'a, S>,
    sample_type: SampleType,
    threshold: AdaptiveThreshold,
    cache_reset: Option<Step>,
}

impl<'a, S: TradeStore + CandleStore> AdaptiveCandleTarget<'a, S> {
    /// Creates a target writing adaptive candles of `symbol` under `name`.
    #[must_use]
    pub fn new(
        store: &'a mut S,
        symbol: impl Into<String>,
        name: impl Into<String>,
        sample_type: SampleType,
        threshold: AdaptiveThreshold,
    ) -> Self {
        Self {
            source: CandleSource {
                store,
                symbol: symbol.into(),
                name: name.into(),
            },
            sample_type,
            threshold,
            cache_reset: None,
        }
    }

    /// Closes the open candle at every boundary of `reset`.
    #[must_use]
    pub const fn with_cache_reset(mut self, reset: Option<Step>) -> Self {
        self.cache_reset = reset;
        self
    }

    /// Returns the threshold of the day starting at `day`, reusing `carried`
    /// when it belongs to that day.
    fn daily_target(
        &self,
        day: DateTime<Utc>,
        carried: Option<DailyTarget>,
    ) -> Result<Option<DailyTarget>> {
        if let Some(target) = carried.filter(|target| target.day == day) {
            return Ok(Some(target));
        }
        let summaries = self.source.summaries(self.threshold.window(day)?)?;
        Ok(summaries.map(|summaries| DailyTarget {
            day,
            value: self.threshold.target_value(&summaries, self.sample_type),
        }))
    }
}

impl<S: TradeStore + CandleStore> AggregationTarget for AdaptiveCandleTarget<'_, S> {
    type Row = AggregatedTrade;
    type Output = Candle;

    fn name(&self) -> &str {
        &self.source.name
    }

    fn initialize(&mut self, range: TimeRange, _retry: bool) -> Result<Initialized> {
        let cache = self
            .source
            .persisted(range.start())?
            .unwrap_or(CacheState::AdaptiveCandle {
                pending: None,
                target: None,
            });
        Ok(Initialized { range, cache })
    }

    fn get_existing(&mut self, range: TimeRange) -> Result<ExistingIndex> {
        self.source.get_existing(range)
    }

    fn purge(&mut self, range: TimeRange) -> Result<()> {
        self.source.purge(range)
    }

    fn can_aggregate(&mut self, range: TimeRange) -> Result<bool> {
        for day in iter_window(range, Step::DAY) {
            if self.daily_target(floor(day.start(), Step::DAY), None)?.is_none() {
                tracing::debug!(%day, "trade summaries missing");
                return Ok(false);
            }
        }
        self.source.trades_ready(range)
    }

    fn get_data_frame(&mut self, range: TimeRange) -> Result<Vec<AggregatedTrade>> {
        self.source.load_trades(range)
    }

    fn get_cache(&mut self, chunk_from: DateTime<Utc>, running: CacheState) -> Result<CacheState> {
        Ok(running.merge(self.source.persisted(chunk_from)?))
    }

    fn aggregate(
        &mut self,
        range: TimeRange,
        rows: Vec<AggregatedTrade>,
        cache: CacheState,
    ) -> Result<(Vec<Candle>, CacheState)> {
        ensure_sorted(&rows)?;

        let mut pending = cache.pending().copied();
        let mut target = match cache {
            CacheState::AdaptiveCandle { target, .. } => target,
            _ => None,
        };
        let mut candles = Vec::new();
        let mut remaining = rows.as_slice();
        for day in iter_window(range, Step::DAY) {
            let split = remaining.partition_point(|trade| trade.timestamp() < day.end());
            let (inside, rest) = remaining.split_at(split);
            remaining = rest;

            let start = floor(day.start(), Step::DAY);
            let daily = self
                .daily_target(start, target)?
                .ok_or_else(|| PipelineError::MissingSummaries {
                    symbol: self.source.symbol.clone(),
                    day: start,
                })?;
            target = Some(daily);

            let mut aggregator = ThresholdAggregator::new(self.sample_type, daily.value)
                .with_reset(self.cache_reset)
                .with_pending(pending);
            for trade in inside {
                aggregator.process(trade, &mut candles);
            }
            candles.extend(aggregator.roll(day.end()));
            pending = aggregator.into_pending();
        }

        let next = CacheState::AdaptiveCandle { pending, target };
        check_volume(&rows, cache, &candles, next)?;
        Ok((candles, next))
    }

    fn write_cache(&mut self, record: &CacheRecord) -> Result<()> {
        self.source.write_cache(record)
    }

    fn write_data(&mut self, range: TimeRange, output: Vec<Candle>) -> Result<()> {
        self.source.write_candles(range, output)
    }
}

/// Verifies that a chunk's trades are accounted for by its candles and state.
fn check_volume(
    rows: &[AggregatedTrade],
    before: CacheState,
    candles: &[Candle],
    after: CacheState,
) -> Result<()> {
    let open = |state: CacheState| state.pending().map_or(0.0, |builder| builder.finish().volume);
    let expected = open(before) + rows.iter().map(|t| t.volume).sum::<f64>();
    let actual = open(after) + candles.iter().map(|c| c.volume).sum::<f64>();
    if approx::relative_eq!(expected, actual, epsilon = 1e-9, max_relative = 1e-9) {
        return Ok(());
    }
    tracing::warn!(expected, actual, "candle volume not conserved");
    Err(AggregateError::ConservationViolated {
        quantity: "volume",
        expected,
        actual,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use ticksmith_types::{TickRecord, TickRule};

    use crate::{AggregationDriver, DriverConfig, MemoryStore, TradeSlice};

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, second).unwrap()
    }

    fn range(from: DateTime<Utc>, to: DateTime<Utc>) -> TimeRange {
        TimeRange::new(from, to).unwrap()
    }

    fn driver() -> AggregationDriver {
        AggregationDriver::new(
            DriverConfig::default().with_max_timestamp_to(at(0, 0, 0) + TimeDelta::days(30)),
        )
    }

    /// One buy tick of volume 1 every 20 seconds over `r`.
    fn seed(store: &mut MemoryStore, r: TimeRange, ok: bool) {
        let mut slice = TradeSlice::new(r, ok);
        let mut timestamp = r.start();
        let mut uid = 0;
        while timestamp < r.end() {
            let price = 100.0 + f64::from(uid % 7);
            slice.raw.push(TickRecord::new(uid.to_string(), timestamp, price, 1.0, TickRule::Buy));
            timestamp += TimeDelta::seconds(20);
            uid += 1;
        }
        store.write_trades("BTC", &slice).unwrap();
    }

    #[test]
    fn test_time_candles_across_chunks() {
        let mut store = MemoryStore::new();
        seed(&mut store, range(at(0, 0, 0), at(2, 0, 0)), true);

        let mut target = TimeCandleTarget::new(&mut store, "BTC", "btc-5t", "5t".parse().unwrap());
        let report = driver()
            .run(&mut target, range(at(0, 0, 0), at(2, 0, 0)), Step::HOUR, false)
            .unwrap();
        assert_eq!(report.chunks_processed, 2);
        assert_eq!(report.samples_written, 24);

        let candles = store.read_candles("btc-5t", range(at(0, 0, 0), at(2, 0, 0))).unwrap();
        assert_eq!(candles.len(), 24);
        assert!(candles.iter().all(|c| c.ticks == 15));
        assert_eq!(candles[12].timestamp, at(1, 0, 0));
    }

    #[test]
    fn test_time_candle_carried_over_chunk_edge() {
        let mut store = MemoryStore::new();
        seed(&mut store, range(at(0, 0, 0), at(2, 0, 0)), true);

        // An hour window spans two half-hour chunks.
        let mut target = TimeCandleTarget::new(&mut store, "BTC", "btc-1h", Step::HOUR);
        driver()
            .run(&mut target, range(at(0, 0, 0), at(0, 30, 0)), Step::HOUR, false)
            .unwrap();
        assert!(store.read_candles("btc-1h", range(at(0, 0, 0), at(2, 0, 0))).unwrap().is_empty());
        let carried = store.read_cache("btc-1h", at(0, 30, 0)).unwrap().unwrap();
        assert_eq!(carried.state.pending().unwrap().finish().ticks, 90);

        let mut target = TimeCandleTarget::new(&mut store, "BTC", "btc-1h", Step::HOUR);
        driver()
            .run(&mut target, range(at(0, 0, 0), at(1, 0, 0)), Step::HOUR, false)
            .unwrap();
        let candles = store.read_candles("btc-1h", range(at(0, 0, 0), at(2, 0, 0))).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].ticks, 180);
        approx::assert_relative_eq!(candles[0].volume, 180.0);
    }

    #[test]
    fn test_waits_for_trades() {
        let mut store = MemoryStore::new();
        seed(&mut store, range(at(0, 0, 0), at(1, 0, 0)), true);
        seed(&mut store, range(at(1, 0, 0), at(2, 0, 0)), false);

        let mut target = TimeCandleTarget::new(&mut store, "BTC", "btc-1t", Step::MINUTE);
        let report = driver()
            .run(&mut target, range(at(0, 0, 0), at(2, 0, 0)), Step::HOUR, false)
            .unwrap();
        assert_eq!(report.chunks_processed, 1);
        assert_eq!(report.chunks_skipped, 1);
        assert!(
            store
                .existing_cache("btc-1t", range(at(1, 0, 0), at(2, 0, 0)))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_constant_candles() {
        let mut store = MemoryStore::new();
        seed(&mut store, range(at(0, 0, 0), at(1, 0, 0)), true);

        let mut target =
            ConstantCandleTarget::new(&mut store, "BTC", "btc-v40", SampleType::Volume, 40.0)
                .unwrap();
        let report = driver()
            .run(&mut target, range(at(0, 0, 0), at(1, 0, 0)), Step::HOUR, false)
            .unwrap();
        // 180 ticks of volume 1: four full candles and 20 carried over.
        assert_eq!(report.samples_written, 4);
        let cache = store.read_cache("btc-v40", at(1, 0, 0)).unwrap().unwrap();
        approx::assert_relative_eq!(
            cache.state.pending().unwrap().sample_value(SampleType::Volume),
            20.0
        );
    }

    #[test]
    fn test_constant_candle_reset() {
        let mut store = MemoryStore::new();
        seed(&mut store, range(at(0, 0, 0), at(2, 0, 0)), true);

        let mut target =
            ConstantCandleTarget::new(&mut store, "BTC", "btc-v100", SampleType::Volume, 100.0)
                .unwrap()
                .with_cache_reset(Some(Step::HOUR));
        driver()
            .run(&mut target, range(at(0, 0, 0), at(2, 0, 0)), Step::HOUR, false)
            .unwrap();
        let candles = store.read_candles("btc-v100", range(at(0, 0, 0), at(2, 0, 0))).unwrap();
        let volumes: Vec<_> = candles.iter().map(|c| c.volume).collect();
        assert_eq!(volumes, vec![100.0, 80.0, 100.0, 80.0]);
    }

    #[test]
    fn test_constant_candles_across_skipped_chunk() {
        let mut store = MemoryStore::new();
        seed(&mut store, range(at(0, 0, 0), at(1, 0, 0)), true);
        seed(&mut store, range(at(1, 0, 0), at(2, 0, 0)), false);
        seed(&mut store, range(at(2, 0, 0), at(3, 0, 0)), true);
        let r = range(at(0, 0, 0), at(3, 0, 0));

        let mut target =
            ConstantCandleTarget::new(&mut store, "BTC", "btc-v100", SampleType::Volume, 100.0)
                .unwrap();
        let report = driver().run(&mut target, r, Step::HOUR, false).unwrap();
        assert_eq!(report.chunks_skipped, 1);

        seed(&mut store, range(at(1, 0, 0), at(2, 0, 0)), true);
        let mut target =
            ConstantCandleTarget::new(&mut store, "BTC", "btc-v100", SampleType::Volume, 100.0)
                .unwrap();
        let report = driver().run(&mut target, r, Step::HOUR, false).unwrap();
        assert_eq!(report.chunks_processed, 1);

        // 540 units in: every unit is in a candle or in exactly one open state.
        let candles = store.read_candles("btc-v100", r).unwrap();
        let closed: f64 = candles.iter().map(|c| c.volume).sum();
        let open = |end| {
            store
                .read_cache("btc-v100", end)
                .unwrap()
                .and_then(|record| record.state.pending().map(|b| b.finish().volume))
                .unwrap_or(0.0)
        };
        approx::assert_relative_eq!(closed, 400.0);
        approx::assert_relative_eq!(open(at(2, 0, 0)), 60.0);
        approx::assert_relative_eq!(open(at(3, 0, 0)), 80.0);
    }

    fn day(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_trade_summary() {
        let mut store = MemoryStore::new();
        seed(&mut store, range(day(1), day(2)), true);

        let mut target = TimeCandleTarget::trade_summary(&mut store, "BTC");
        assert_eq!(target.name(), "BTC-daily-summary");
        let report = driver().run(&mut target, range(day(1), day(2)), Step::DAY, false).unwrap();
        assert_eq!(report.samples_written, 1);

        let summaries = store.read_candles("BTC-daily-summary", range(day(1), day(2))).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].timestamp, day(1));
        assert_eq!(summaries[0].ticks, 4_320);
    }

    #[test]
    fn test_adaptive_candles() {
        let mut store = MemoryStore::new();
        seed(&mut store, range(day(1), day(3)), true);
        let threshold = AdaptiveThreshold::new(1, 4).unwrap();
        let r = range(day(2), day(3));

        // Waits until the previous day is summarized.
        let mut target =
            AdaptiveCandleTarget::new(&mut store, "BTC", "btc-a4", SampleType::Volume, threshold);
        let report = driver().run(&mut target, r, Step::DAY, false).unwrap();
        assert_eq!(report.chunks_skipped, 1);
        assert_eq!(report.chunks_processed, 0);

        let mut summary = TimeCandleTarget::trade_summary(&mut store, "BTC");
        driver().run(&mut summary, range(day(1), day(2)), Step::DAY, false).unwrap();

        let mut target =
            AdaptiveCandleTarget::new(&mut store, "BTC", "btc-a4", SampleType::Volume, threshold);
        let report = driver().run(&mut target, r, Step::DAY, false).unwrap();
        assert_eq!(report.chunks_skipped, 0);
        assert_eq!(report.samples_written, 4);

        // 4320 units the day before, spread over four candles a day.
        let candles = store.read_candles("btc-a4", r).unwrap();
        assert!(candles.iter().all(|c| (c.volume - 1_080.0).abs() < 1e-9));
        let cache = store.read_cache("btc-a4", day(3)).unwrap().unwrap();
        assert_eq!(
            cache.state,
            CacheState::AdaptiveCandle {
                pending: None,
                target: Some(DailyTarget {
                    day: day(2),
                    value: 1_080.0,
                }),
            }
        );
    }

    #[test]
    fn test_adaptive_target_reused_within_day() {
        let mut store = MemoryStore::new();
        store.set_unavailable(true);
        let threshold = AdaptiveThreshold::new(7, 24).unwrap();
        let target =
            AdaptiveCandleTarget::new(&mut store, "BTC", "btc-a24", SampleType::Ticks, threshold);

        let carried = DailyTarget {
            day: day(2),
            value: 42.0,
        };
        assert_eq!(target.daily_target(day(2), Some(carried)).unwrap(), Some(carried));
        // Another day reads the summaries again.
        assert!(target.daily_target(day(3), Some(carried)).is_err());
    }

    #[test]
    fn test_invalid_threshold() {
        let mut store = MemoryStore::new();
        let err =
            ConstantCandleTarget::new(&mut store, "BTC", "x", SampleType::Ticks, 0.0).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Aggregate(AggregateError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_boundary_semantics() {
        let mut store = MemoryStore::new();
        let mut slice = TradeSlice::new(range(at(0, 0, 0), at(1, 0, 0)), true);
        slice.raw = vec![
            TickRecord::new("start", at(0, 0, 0), 1.0, 1.0, TickRule::Buy),
            TickRecord::new("end", at(0, 30, 0), 1.0, 1.0, TickRule::Buy),
        ];
        store.write_trades("BTC", &slice).unwrap();

        let mut target = TimeCandleTarget::new(&mut store, "BTC", "b", Step::MINUTE);
        let rows = target.get_data_frame(range(at(0, 0, 0), at(0, 30, 0))).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].uid, "start");
    }
}
