//! Carry-over state threaded between chunks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticksmith_aggregate::CandleBuilder;
use ticksmith_types::TimeRange;

/// Threshold of an adaptive candle for one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTarget {
    /// Start of the day.
    pub day: DateTime<Utc>,
    /// Sample value a candle closes at.
    pub value: f64,
}

/// Partial aggregation carried from one chunk to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheState {
    /// Nothing carried over.
    #[default]
    Empty,
    /// Open time-window candle.
    TimeCandle {
        /// Candle whose window has not closed yet.
        pending: Option<CandleBuilder>,
    },
    /// Open threshold candle.
    ConstantCandle {
        /// Candle that has not reached its target yet.
        pending: Option<CandleBuilder>,
    },
    /// Open adaptive threshold candle.
    AdaptiveCandle {
        /// Candle that has not reached its target yet.
        pending: Option<CandleBuilder>,
        /// Threshold of the day the state was produced in.
        target: Option<DailyTarget>,
    },
}

impl CacheState {
    /// Returns true if nothing is carried over.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the open candle, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<&CandleBuilder> {
        match self {
            Self::Empty => None,
            Self::TimeCandle { pending }
            | Self::ConstantCandle { pending }
            | Self::AdaptiveCandle { pending, .. } => pending.as_ref(),
        }
    }

    /// Merges persisted state into the running state.
    ///
    /// Persisted state wins unless it is empty.
    #[must_use]
    pub fn merge(self, persisted: Option<Self>) -> Self {
        persisted.filter(|state| !state.is_empty()).unwrap_or(self)
    }
}

/// Cache state as persisted after a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Chunk the state was produced by.
    pub range: TimeRange,
    /// State at the end of the chunk.
    pub state: CacheState,
}

impl CacheRecord {
    /// Creates a new record.
    #[must_use]
    pub const fn new(range: TimeRange, state: CacheState) -> Self {
        Self { range, state }
    }
}
