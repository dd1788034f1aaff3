//! Streaming trade-to-candle aggregation.

use chrono::{DateTime, Utc};
use ticksmith_calendar::{floor, next_boundary};
use ticksmith_types::Step;

use crate::{Candle, CandleBuilder, SampleType, Trade};

/// Streaming time-window candle aggregator.
///
/// Aggregates trades into calendar-aligned candles of a fixed step. The open
/// candle can be taken out with [`CandleAggregator::into_pending`] and fed back
/// with [`CandleAggregator::resume`] to continue across chunk boundaries.
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    step: Step,
    current: Option<CandleBuilder>,
}

impl CandleAggregator {
    /// Creates a new aggregator for the given step.
    #[must_use]
    pub const fn new(step: Step) -> Self {
        Self {
            step,
            current: None,
        }
    }

    /// Creates an aggregator that continues a previously open candle.
    #[must_use]
    pub const fn resume(step: Step, pending: Option<CandleBuilder>) -> Self {
        Self {
            step,
            current: pending,
        }
    }

    /// Returns the step being aggregated to.
    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }

    /// Processes a trade, potentially emitting a completed candle.
    ///
    /// Returns `Some(candle)` when a candle is completed by this trade,
    /// `None` otherwise.
    pub fn process<T: Trade>(&mut self, trade: &T) -> Option<Candle> {
        let candle_start = floor(trade.timestamp(), self.step);

        match self.current.take() {
            Some(mut builder) if builder.timestamp() == candle_start => {
                builder.update(trade);
                self.current = Some(builder);
                None
            }
            Some(builder) => {
                self.current = Some(CandleBuilder::new(candle_start, trade));
                Some(builder.finish())
            }
            None => {
                self.current = Some(CandleBuilder::new(candle_start, trade));
                None
            }
        }
    }

    /// Closes the open candle if its window ends at or before `timestamp`.
    pub fn flush_until(&mut self, timestamp: DateTime<Utc>) -> Option<Candle> {
        let window_end = next_boundary(self.current.as_ref()?.timestamp(), self.step);
        if window_end <= timestamp {
            self.current.take().map(CandleBuilder::finish)
        } else {
            None
        }
    }

    /// Returns the open candle, if any, for carrying to the next chunk.
    #[must_use]
    pub const fn into_pending(self) -> Option<CandleBuilder> {
        self.current
    }

    /// Finishes aggregation, returning any remaining partial candle.
    #[must_use]
    pub fn finish(self) -> Option<Candle> {
        self.current.map(CandleBuilder::finish)
    }
}

/// Streaming threshold candle aggregator.
///
/// A candle closes once its accumulated sample value reaches the target. With
/// a reset step, the open candle also closes at each reset boundary.
#[derive(Debug, Clone)]
pub struct ThresholdAggregator {
    sample_type: SampleType,
    target: f64,
    reset: Option<Step>,
    current: Option<CandleBuilder>,
}

impl ThresholdAggregator {
    /// Creates a new aggregator.
    #[must_use]
    pub const fn new(sample_type: SampleType, target: f64) -> Self {
        Self {
            sample_type,
            target,
            reset: None,
            current: None,
        }
    }

    /// Sets the reset step.
    #[must_use]
    pub const fn with_reset(mut self, reset: Option<Step>) -> Self {
        self.reset = reset;
        self
    }

    /// Continues a previously open candle.
    #[must_use]
    pub const fn with_pending(mut self, pending: Option<CandleBuilder>) -> Self {
        self.current = pending;
        self
    }

    /// Returns the accumulated sample value of the open candle.
    #[must_use]
    pub fn sample_value(&self) -> f64 {
        self.current
            .as_ref()
            .map_or(0.0, |builder| builder.sample_value(self.sample_type))
    }

    /// Processes a trade, appending any candles it completes to `out`.
    pub fn process<T: Trade>(&mut self, trade: &T, out: &mut Vec<Candle>) {
        out.extend(self.roll(trade.timestamp()));

        let builder = match self.current.take() {
            Some(mut builder) => {
                builder.update(trade);
                builder
            }
            None => CandleBuilder::new(trade.timestamp(), trade),
        };

        if builder.sample_value(self.sample_type) >= self.target {
            out.push(builder.finish());
        } else {
            self.current = Some(builder);
        }
    }

    /// Closes the open candle if `timestamp` falls in a later reset period.
    pub fn roll(&mut self, timestamp: DateTime<Utc>) -> Option<Candle> {
        let reset = self.reset?;
        let open = self.current.as_ref()?.timestamp();
        if floor(open, reset) == floor(timestamp, reset) {
            return None;
        }
        self.current.take().map(CandleBuilder::finish)
    }

    /// Returns the open candle, if any, for carrying to the next chunk.
    #[must_use]
    pub const fn into_pending(self) -> Option<CandleBuilder> {
        self.current
    }
}
