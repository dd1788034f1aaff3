//! Trade tick representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::InvalidTickRule;

/// Aggressor side of a trade.
///
/// Serialized as the integer sign used by exchanges: `1` for buy-initiated,
/// `-1` for sell-initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum TickRule {
    /// Buyer was the aggressor.
    Buy,
    /// Seller was the aggressor.
    Sell,
}

impl TickRule {
    /// Returns the sign of the tick rule.
    #[must_use]
    pub const fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }

    /// Returns true for buy-initiated trades.
    #[must_use]
    pub const fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl From<TickRule> for i8 {
    fn from(rule: TickRule) -> Self {
        rule.sign()
    }
}

impl TryFrom<i8> for TickRule {
    type Error = InvalidTickRule;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Buy),
            -1 => Ok(Self::Sell),
            other => Err(InvalidTickRule(other)),
        }
    }
}

impl std::fmt::Display for TickRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sign())
    }
}

/// A single executed trade as produced by an upstream ingester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRecord {
    /// Exchange trade identifier.
    pub uid: String,
    /// Timestamp of the trade (UTC).
    pub timestamp: DateTime<Utc>,
    /// Nanosecond offset reported in addition to the timestamp.
    #[serde(default)]
    pub nanoseconds: u32,
    /// Execution price.
    pub price: f64,
    /// Executed quantity.
    pub volume: f64,
    /// Price times volume.
    pub notional: f64,
    /// Aggressor side.
    pub tick_rule: TickRule,
    /// Optional symbol, present when a slice mixes instruments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl TickRecord {
    /// Creates a new tick, deriving the notional from price and volume.
    #[must_use]
    pub fn new(
        uid: impl Into<String>,
        timestamp: DateTime<Utc>,
        price: f64,
        volume: f64,
        tick_rule: TickRule,
    ) -> Self {
        Self {
            uid: uid.into(),
            timestamp,
            nanoseconds: 0,
            price,
            volume,
            notional: price * volume,
            tick_rule,
            symbol: None,
        }
    }

    /// Sets the nanosecond offset.
    #[must_use]
    pub fn with_nanoseconds(mut self, nanoseconds: u32) -> Self {
        self.nanoseconds = nanoseconds;
        self
    }

    /// Sets the symbol.
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Returns the ordering key `(timestamp, nanoseconds)`.
    #[must_use]
    pub const fn sort_key(&self) -> (DateTime<Utc>, u32) {
        (self.timestamp, self.nanoseconds)
    }

    /// Returns true if this trade was buy-initiated.
    #[must_use]
    pub const fn is_buy(&self) -> bool {
        self.tick_rule.is_buy()
    }
}
