//! Row capabilities shared by the aggregation primitives.

use std::ops::AddAssign;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticksmith_types::{TickRecord, TickRule, TimeRange};

use crate::{AggregateError, Result};

/// Running totals carried by filtered rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Total volume.
    pub total_volume: f64,
    /// Volume of buy-initiated trades.
    pub total_buy_volume: f64,
    /// Total notional.
    pub total_notional: f64,
    /// Notional of buy-initiated trades.
    pub total_buy_notional: f64,
    /// Total number of ticks.
    pub total_ticks: u64,
    /// Number of buy-initiated ticks.
    pub total_buy_ticks: u64,
}

impl Totals {
    /// Accumulates a single trade.
    pub fn add_trade<T: Trade>(&mut self, trade: &T) {
        self.total_volume += trade.volume();
        self.total_notional += trade.notional();
        self.total_ticks += trade.ticks();
        if trade.tick_rule().is_some_and(|rule| rule.is_buy()) {
            self.total_buy_volume += trade.volume();
            self.total_buy_notional += trade.notional();
            self.total_buy_ticks += trade.ticks();
        }
    }

    /// Returns the totals of a run of trades.
    #[must_use]
    pub fn of<T: Trade>(trades: &[T]) -> Self {
        let mut totals = Self::default();
        for trade in trades {
            totals.add_trade(trade);
        }
        totals
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "totalVolume" => Some(self.total_volume),
            "totalBuyVolume" => Some(self.total_buy_volume),
            "totalNotional" => Some(self.total_notional),
            "totalBuyNotional" => Some(self.total_buy_notional),
            "totalTicks" => Some(self.total_ticks as f64),
            "totalBuyTicks" => Some(self.total_buy_ticks as f64),
            _ => None,
        }
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Self) {
        self.total_volume += rhs.total_volume;
        self.total_buy_volume += rhs.total_buy_volume;
        self.total_notional += rhs.total_notional;
        self.total_buy_notional += rhs.total_buy_notional;
        self.total_ticks += rhs.total_ticks;
        self.total_buy_ticks += rhs.total_buy_ticks;
    }
}

/// A time-ordered trade-like row.
///
/// Rows that carry running [`Totals`] set [`Trade::HAS_TOTALS`] so callers
/// can branch on the capability instead of probing fields.
pub trait Trade {
    /// Whether [`Trade::totals`] returns a value.
    const HAS_TOTALS: bool = false;

    /// Identifier of the row.
    fn uid(&self) -> &str;

    /// Timestamp of the row.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Nanosecond offset.
    fn nanoseconds(&self) -> u32;

    /// Price of the row.
    fn price(&self) -> f64;

    /// Volume of the row.
    fn volume(&self) -> f64;

    /// Notional of the row.
    fn notional(&self) -> f64;

    /// Number of ticks the row represents.
    fn ticks(&self) -> u64 {
        1
    }

    /// Aggressor side, if known.
    fn tick_rule(&self) -> Option<TickRule>;

    /// Running totals, for rows produced by the volume filter.
    fn totals(&self) -> Option<Totals> {
        None
    }

    /// Ordering key.
    fn sort_key(&self) -> (DateTime<Utc>, u32) {
        (self.timestamp(), self.nanoseconds())
    }
}

impl Trade for TickRecord {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }

    fn price(&self) -> f64 {
        self.price
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn notional(&self) -> f64 {
        self.notional
    }

    fn tick_rule(&self) -> Option<TickRule> {
        Some(self.tick_rule)
    }
}

/// A row with a time anchor and named numeric attributes.
pub trait Sample {
    /// Time anchor of the row.
    fn sample_time(&self) -> DateTime<Utc>;

    /// Value of a named attribute, `None` if the row has no such attribute.
    ///
    /// Null values of known attributes read as zero.
    fn attribute(&self, name: &str) -> Option<f64>;
}

impl Sample for TickRecord {
    fn sample_time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "price" => Some(self.price),
            "volume" => Some(self.volume),
            "notional" => Some(self.notional),
            "ticks" => Some(1.0),
            "nanoseconds" => Some(f64::from(self.nanoseconds)),
            _ => None,
        }
    }
}

/// Returns an error if rows are not ordered by `(timestamp, nanoseconds)`.
///
/// # Errors
///
/// Returns [`AggregateError::Unsorted`] with the first out-of-order index.
pub fn ensure_sorted<T: Trade>(trades: &[T]) -> Result<()> {
    trades
        .windows(2)
        .position(|pair| pair[1].sort_key() < pair[0].sort_key())
        .map_or(Ok(()), |position| {
            Err(AggregateError::Unsorted {
                index: position + 1,
            })
        })
}

/// Returns the rows with `range.start() <= timestamp < range.end()`.
#[must_use]
pub fn filter_by_timestamp<T: Trade + Clone>(rows: &[T], range: TimeRange) -> Vec<T> {
    rows.iter()
        .filter(|row| range.contains(row.timestamp()))
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    pub(crate) fn at(minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, second).unwrap()
    }

    pub(crate) fn tick(
        uid: &str,
        timestamp: DateTime<Utc>,
        price: f64,
        volume: f64,
        rule: TickRule,
    ) -> TickRecord {
        TickRecord::new(uid, timestamp, price, volume, rule)
    }

    pub(crate) fn tick_at_ms(millis: i64, price: f64, volume: f64, rule: TickRule) -> TickRecord {
        let timestamp = at(0, 0) + TimeDelta::milliseconds(millis);
        TickRecord::new(millis.to_string(), timestamp, price, volume, rule)
    }
}
