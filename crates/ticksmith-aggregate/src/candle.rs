//! Candle data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Sample, Trade};

/// Quantity a threshold candle accumulates towards its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    /// Traded volume.
    #[default]
    Volume,
    /// Traded notional.
    Notional,
    /// Number of ticks.
    Ticks,
}

impl SampleType {
    /// Returns the sample type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Notional => "notional",
            Self::Ticks => "ticks",
        }
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SampleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "volume" => Ok(Self::Volume),
            "notional" => Ok(Self::Notional),
            "ticks" => Ok(Self::Ticks),
            _ => Err(format!("unknown sample type: {s}")),
        }
    }
}

/// A completed candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Candle open time.
    pub timestamp: DateTime<Utc>,
    /// First trade price.
    pub open: f64,
    /// Highest trade price.
    pub high: f64,
    /// Lowest trade price.
    pub low: f64,
    /// Last trade price.
    pub close: f64,
    /// Total volume.
    pub volume: f64,
    /// Volume of buy-initiated trades.
    pub buy_volume: f64,
    /// Total notional.
    pub notional: f64,
    /// Notional of buy-initiated trades.
    pub buy_notional: f64,
    /// Number of ticks.
    pub ticks: u64,
    /// Number of buy-initiated ticks.
    pub buy_ticks: u64,
}

impl Candle {
    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if the candle closed above its open.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns the volume-weighted average price.
    #[must_use]
    pub fn vwap(&self) -> Option<f64> {
        (self.volume > 0.0).then(|| self.notional / self.volume)
    }

    /// Returns the total of `sample_type` in this candle.
    #[must_use]
    pub fn sample_value(&self, sample_type: SampleType) -> f64 {
        match sample_type {
            SampleType::Volume => self.volume,
            SampleType::Notional => self.notional,
            SampleType::Ticks => self.ticks as f64,
        }
    }
}

impl Sample for Candle {
    fn sample_time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "open" => Some(self.open),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "close" => Some(self.close),
            "volume" => Some(self.volume),
            "buyVolume" => Some(self.buy_volume),
            "notional" => Some(self.notional),
            "buyNotional" => Some(self.buy_notional),
            "ticks" => Some(self.ticks as f64),
            "buyTicks" => Some(self.buy_ticks as f64),
            _ => None,
        }
    }
}

/// An in-progress candle.
///
/// Serializable so a partially filled candle can be carried between chunks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleBuilder {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    buy_volume: f64,
    notional: f64,
    buy_notional: f64,
    ticks: u64,
    buy_ticks: u64,
}

impl CandleBuilder {
    /// Starts a candle at `timestamp` from its first trade.
    #[must_use]
    pub fn new<T: Trade>(timestamp: DateTime<Utc>, trade: &T) -> Self {
        let price = trade.price();
        let mut builder = Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
            buy_volume: 0.0,
            notional: 0.0,
            buy_notional: 0.0,
            ticks: 0,
            buy_ticks: 0,
        };
        builder.accumulate(trade);
        builder
    }

    /// Updates the candle with another trade.
    pub fn update<T: Trade>(&mut self, trade: &T) {
        let price = trade.price();
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.accumulate(trade);
    }

    fn accumulate<T: Trade>(&mut self, trade: &T) {
        self.volume += trade.volume();
        self.notional += trade.notional();
        self.ticks += trade.ticks();
        if trade.tick_rule().is_some_and(|rule| rule.is_buy()) {
            self.buy_volume += trade.volume();
            self.buy_notional += trade.notional();
            self.buy_ticks += trade.ticks();
        }
    }

    /// Returns the candle open time.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the accumulated value of `sample_type`.
    #[must_use]
    pub fn sample_value(&self, sample_type: SampleType) -> f64 {
        match sample_type {
            SampleType::Volume => self.volume,
            SampleType::Notional => self.notional,
            SampleType::Ticks => self.ticks as f64,
        }
    }

    /// Finishes building and returns the candle.
    #[must_use]
    pub const fn finish(self) -> Candle {
        Candle {
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            buy_volume: self.buy_volume,
            notional: self.notional,
            buy_notional: self.buy_notional,
            ticks: self.ticks,
            buy_ticks: self.buy_ticks,
        }
    }
}
