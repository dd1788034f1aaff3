//! In-process collaborators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ticksmith_aggregate::Candle;
use ticksmith_calendar::decompose;
use ticksmith_types::{TickRecord, TimeRange};

use crate::{
    CacheRecord, CandleData, CandleStore, CatalogEntry, SourceError, StoreError, TickBatch,
    TickSource, TradeData, TradeSlice, TradeStore,
};

/// Records of one symbol or candle name, keyed by range start.
type Records<R> = BTreeMap<DateTime<Utc>, R>;

/// Trade and candle store held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    trades: BTreeMap<String, Records<TradeData>>,
    caches: BTreeMap<String, Records<CacheRecord>>,
    candles: BTreeMap<String, Records<CandleData>>,
    unavailable: bool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`].
    pub const fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

/// Removes records whose start lies inside `range`.
fn clear<R>(records: &mut Records<R>, range: TimeRange) {
    records.retain(|start, _| !range.contains(*start));
}

/// Returns records starting inside `range`.
fn starting_within<R>(records: Option<&Records<R>>, range: TimeRange) -> impl Iterator<Item = &R> {
    records
        .into_iter()
        .flat_map(move |records| records.range(range.start()..range.end()).map(|(_, r)| r))
}

impl TradeStore for MemoryStore {
    fn existing_trades(
        &self,
        symbol: &str,
        range: TimeRange,
        retry: bool,
    ) -> Result<Vec<CatalogEntry>, StoreError> {
        self.check()?;
        Ok(starting_within(self.trades.get(symbol), range)
            .filter(|record| !retry || record.ok)
            .map(TradeData::catalog_entry)
            .collect())
    }

    fn read_trades(&self, symbol: &str, range: TimeRange) -> Result<Vec<TradeData>, StoreError> {
        self.check()?;
        Ok(self
            .trades
            .get(symbol)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|record| record.range.intersect(&range).is_some())
            .cloned()
            .collect())
    }

    fn write_trades(&mut self, symbol: &str, slice: &TradeSlice) -> Result<(), StoreError> {
        self.check()?;
        let records = self.trades.entry(symbol.to_string()).or_default();
        clear(records, slice.range);
        for record in slice.split() {
            records.insert(record.range.start(), record);
        }
        Ok(())
    }
}

impl CandleStore for MemoryStore {
    fn existing_cache(
        &self,
        name: &str,
        range: TimeRange,
    ) -> Result<Vec<CatalogEntry>, StoreError> {
        self.check()?;
        Ok(starting_within(self.caches.get(name), range)
            .flat_map(|record| decompose(record.range))
            .collect())
    }

    fn read_cache(
        &self,
        name: &str,
        end: DateTime<Utc>,
    ) -> Result<Option<CacheRecord>, StoreError> {
        self.check()?;
        Ok(self
            .caches
            .get(name)
            .and_then(|records| records.values().find(|record| record.range.end() == end))
            .copied())
    }

    fn write_cache(&mut self, name: &str, record: &CacheRecord) -> Result<(), StoreError> {
        self.check()?;
        let records = self.caches.entry(name.to_string()).or_default();
        clear(records, record.range);
        records.insert(record.range.start(), *record);
        Ok(())
    }

    fn read_candles(&self, name: &str, range: TimeRange) -> Result<Vec<Candle>, StoreError> {
        self.check()?;
        let mut candles: Vec<_> = self
            .candles
            .get(name)
            .into_iter()
            .flat_map(BTreeMap::values)
            .flat_map(|data| data.candles.iter())
            .filter(|candle| range.contains(candle.timestamp))
            .cloned()
            .collect();
        candles.sort_by_key(|candle| candle.timestamp);
        Ok(candles)
    }

    fn write_candles(&mut self, name: &str, data: &CandleData) -> Result<(), StoreError> {
        self.check()?;
        let records = self.candles.entry(name.to_string()).or_default();
        clear(records, data.range);
        records.insert(data.range.start(), data.clone());
        Ok(())
    }

    fn purge(&mut self, name: &str, range: TimeRange) -> Result<(), StoreError> {
        self.check()?;
        if let Some(records) = self.caches.get_mut(name) {
            clear(records, range);
        }
        if let Some(records) = self.candles.get_mut(name) {
            clear(records, range);
        }
        Ok(())
    }
}

/// Tick source serving ticks held in memory.
///
/// Intervals ending after the completeness cutoff are reported incomplete.
#[derive(Debug, Clone, Default)]
pub struct MemoryTickSource {
    ticks: BTreeMap<String, Vec<TickRecord>>,
    complete_until: Option<DateTime<Utc>>,
    fetches: usize,
}

impl MemoryTickSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds ticks for a symbol, keeping them ordered.
    #[must_use]
    pub fn with_ticks(mut self, symbol: impl Into<String>, ticks: Vec<TickRecord>) -> Self {
        let entry = self.ticks.entry(symbol.into()).or_default();
        entry.extend(ticks);
        entry.sort_by_key(TickRecord::sort_key);
        self
    }

    /// Reports intervals ending after `cutoff` as incomplete.
    #[must_use]
    pub const fn with_complete_until(mut self, cutoff: DateTime<Utc>) -> Self {
        self.complete_until = Some(cutoff);
        self
    }

    /// Returns the number of fetches served.
    #[must_use]
    pub const fn fetches(&self) -> usize {
        self.fetches
    }
}

impl TickSource for MemoryTickSource {
    fn fetch(&mut self, symbol: &str, range: TimeRange) -> Result<TickBatch, SourceError> {
        self.fetches += 1;
        let ticks = self
            .ticks
            .get(symbol)
            .ok_or_else(|| SourceError::new(symbol, "unknown symbol"))?
            .iter()
            .filter(|tick| range.contains(tick.timestamp))
            .cloned()
            .collect();
        let complete = self.complete_until.is_none_or(|cutoff| range.end() <= cutoff);
        Ok(TickBatch { ticks, complete })
    }
}
