//! Collaborator contracts and the records they exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticksmith_aggregate::{AggregatedTrade, Candle, Cluster, Trade, VolumeBar};
use ticksmith_calendar::decompose;
use ticksmith_types::{Frequency, TickRecord, TimeRange};

use crate::{CacheRecord, SourceError, StoreError};

/// A catalog entry: the start of a committed interval and its granularity.
pub type CatalogEntry = (DateTime<Utc>, Frequency);

/// Raw and derived trade data for one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeData {
    /// Interval covered by the record.
    pub range: TimeRange,
    /// Catalog granularity of the record.
    pub frequency: Frequency,
    /// False if the source reported the interval as incomplete.
    pub ok: bool,
    /// Raw ticks.
    #[serde(default)]
    pub raw: Vec<TickRecord>,
    /// Merged executions.
    #[serde(default)]
    pub aggregated: Vec<AggregatedTrade>,
    /// Volume-filtered bars.
    #[serde(default)]
    pub filtered: Vec<VolumeBar>,
    /// Directional clusters.
    #[serde(default)]
    pub clustered: Vec<Cluster>,
}

impl TradeData {
    /// Returns the catalog entry of this record.
    #[must_use]
    pub const fn catalog_entry(&self) -> CatalogEntry {
        (self.range.start(), self.frequency)
    }

    /// Returns the trades candles are built from.
    ///
    /// Merged executions when they were saved, otherwise raw ticks as
    /// single-tick executions.
    #[must_use]
    pub fn trades(&self) -> Vec<AggregatedTrade> {
        if self.aggregated.is_empty() {
            self.raw.iter().map(AggregatedTrade::from).collect()
        } else {
            self.aggregated.clone()
        }
    }
}

/// The output of ingesting one work item, before it is split into records.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSlice {
    /// Interval the slice covers.
    pub range: TimeRange,
    /// False if the source reported the interval as incomplete.
    pub ok: bool,
    /// Raw ticks.
    pub raw: Vec<TickRecord>,
    /// Merged executions.
    pub aggregated: Vec<AggregatedTrade>,
    /// Volume-filtered bars.
    pub filtered: Vec<VolumeBar>,
    /// Directional clusters.
    pub clustered: Vec<Cluster>,
}

impl TradeSlice {
    /// Creates an empty slice.
    #[must_use]
    pub const fn new(range: TimeRange, ok: bool) -> Self {
        Self {
            range,
            ok,
            raw: Vec::new(),
            aggregated: Vec::new(),
            filtered: Vec::new(),
            clustered: Vec::new(),
        }
    }

    /// Splits the slice into one record per aligned catalog entry.
    #[must_use]
    pub fn split(&self) -> Vec<TradeData> {
        decompose(self.range)
            .into_iter()
            .filter_map(|(timestamp, frequency)| {
                let entry = TimeRange::try_new(
                    timestamp.max(self.range.start()),
                    (timestamp + frequency.step().duration()).min(self.range.end()),
                )?;
                Some(TradeData {
                    range: entry,
                    frequency,
                    ok: self.ok,
                    raw: rows_within(&self.raw, entry, |t| t.timestamp),
                    aggregated: rows_within(&self.aggregated, entry, Trade::timestamp),
                    filtered: rows_within(&self.filtered, entry, Trade::timestamp),
                    clustered: rows_within(&self.clustered, entry, |c| c.timestamp),
                })
            })
            .collect()
    }
}

fn rows_within<R: Clone>(
    rows: &[R],
    range: TimeRange,
    timestamp: impl Fn(&R) -> DateTime<Utc>,
) -> Vec<R> {
    rows.iter()
        .filter(|row| range.contains(timestamp(row)))
        .cloned()
        .collect()
}

/// Candles written for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleData {
    /// Chunk the candles were produced by.
    pub range: TimeRange,
    /// Candles closed while processing the chunk.
    pub candles: Vec<Candle>,
}

/// Storage of raw and derived trade data, keyed by symbol and time.
pub trait TradeStore {
    /// Returns catalog entries starting inside `range`.
    ///
    /// With `retry`, records flagged as incomplete are left out so they are
    /// fetched again.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn existing_trades(
        &self,
        symbol: &str,
        range: TimeRange,
        retry: bool,
    ) -> Result<Vec<CatalogEntry>, StoreError>;

    /// Returns the records overlapping `range`, ordered by time.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be read.
    fn read_trades(&self, symbol: &str, range: TimeRange) -> Result<Vec<TradeData>, StoreError>;

    /// Replaces the records starting inside the slice's range with the slice.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be written.
    fn write_trades(&mut self, symbol: &str, slice: &TradeSlice) -> Result<(), StoreError>;
}

/// Storage of candle caches and candle output, keyed by candle name and time.
pub trait CandleStore {
    /// Returns catalog entries of cache records starting inside `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn existing_cache(&self, name: &str, range: TimeRange)
    -> Result<Vec<CatalogEntry>, StoreError>;

    /// Returns the cache record whose chunk ends at `end`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    fn read_cache(&self, name: &str, end: DateTime<Utc>) -> Result<Option<CacheRecord>, StoreError>;

    /// Replaces cache records starting inside the record's range.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn write_cache(&mut self, name: &str, record: &CacheRecord) -> Result<(), StoreError>;

    /// Returns candles whose timestamp lies inside `range`, ordered by time.
    ///
    /// # Errors
    ///
    /// Returns an error if the candles cannot be read.
    fn read_candles(&self, name: &str, range: TimeRange) -> Result<Vec<Candle>, StoreError>;

    /// Replaces candle data starting inside the data's range.
    ///
    /// # Errors
    ///
    /// Returns an error if the candles cannot be written.
    fn write_candles(&mut self, name: &str, data: &CandleData) -> Result<(), StoreError>;

    /// Deletes cache records and candle data starting inside `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be deleted.
    fn purge(&mut self, name: &str, range: TimeRange) -> Result<(), StoreError>;
}

/// Ticks fetched for one interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickBatch {
    /// Ticks, ordered by time.
    pub ticks: Vec<TickRecord>,
    /// False if the source could not deliver the whole interval.
    pub complete: bool,
}

/// External retrieval of raw ticks.
pub trait TickSource {
    /// Fetches the ticks of `symbol` inside `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails.
    fn fetch(&mut self, symbol: &str, range: TimeRange) -> Result<TickBatch, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ticksmith_types::TickRule;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_split_by_catalog_entry() {
        let range = TimeRange::new(at(0, 58), at(2, 0)).unwrap();
        let mut slice = TradeSlice::new(range, true);
        slice.raw = vec![
            TickRecord::new("a", at(0, 58), 1.0, 1.0, TickRule::Buy),
            TickRecord::new("b", at(1, 30), 1.0, 1.0, TickRule::Sell),
        ];

        let records = slice.split();
        let entries: Vec<_> = records.iter().map(TradeData::catalog_entry).collect();
        assert_eq!(
            entries,
            vec![
                (at(0, 58), Frequency::Minute),
                (at(0, 59), Frequency::Minute),
                (at(1, 0), Frequency::Hour),
            ]
        );
        assert_eq!(records[0].raw.len(), 1);
        assert!(records[1].raw.is_empty());
        assert_eq!(records[2].raw[0].uid, "b");
        assert!(records.iter().all(|r| r.ok));
    }

    #[test]
    fn test_trades_falls_back_to_raw() {
        let range = TimeRange::new(at(0, 0), at(0, 1)).unwrap();
        let mut slice = TradeSlice::new(range, true);
        slice.raw = vec![TickRecord::new("a", at(0, 0), 2.0, 3.0, TickRule::Buy)];
        let record = &slice.split()[0];
        let trades = record.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].ticks, 1);
    }
}
