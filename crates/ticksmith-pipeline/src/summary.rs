//! Daily trade summaries and the adaptive thresholds sized from them.

use chrono::{DateTime, TimeDelta, Utc};
use ticksmith_aggregate::{Candle, SampleType};
use ticksmith_calendar::floor;
use ticksmith_types::{Step, TimeRange};

use crate::{PipelineError, Result};

/// Returns the dataset the daily trade summaries of `symbol` are stored under.
///
/// A summary is a one-day time candle, built with
/// [`TimeCandleTarget::trade_summary`](crate::TimeCandleTarget::trade_summary).
#[must_use]
pub fn trade_summary_name(symbol: &str) -> String {
    format!("{symbol}-daily-summary")
}

/// Candle threshold derived from a moving average of daily trade summaries.
///
/// The threshold of a day is the sampled total of the preceding
/// `moving_average_days` days, divided by the days and by
/// `target_candles_per_day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveThreshold {
    /// Days the moving average spans.
    pub moving_average_days: u32,
    /// Candles a day of average activity closes.
    pub target_candles_per_day: u32,
}

impl AdaptiveThreshold {
    /// Creates a new threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if either count is zero.
    pub const fn new(moving_average_days: u32, target_candles_per_day: u32) -> Result<Self> {
        if moving_average_days == 0 || target_candles_per_day == 0 {
            return Err(PipelineError::InvalidAdaptiveThreshold {
                moving_average_days,
                target_candles_per_day,
            });
        }
        Ok(Self {
            moving_average_days,
            target_candles_per_day,
        })
    }

    /// Returns the days whose summaries size the candles of the day holding
    /// `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns an error if the window falls outside the supported time range.
    pub fn window(&self, timestamp: DateTime<Utc>) -> Result<TimeRange> {
        let day = floor(timestamp, Step::DAY);
        let start = day - TimeDelta::days(i64::from(self.moving_average_days));
        Ok(TimeRange::new(start, day)?)
    }

    /// Returns the threshold sized from the summaries of a window.
    ///
    /// Days without trades have no summary and count as zero.
    #[must_use]
    pub fn target_value(&self, summaries: &[Candle], sample_type: SampleType) -> f64 {
        let total: f64 = summaries
            .iter()
            .map(|summary| summary.sample_value(sample_type))
            .sum();
        total / f64::from(self.moving_average_days) / f64::from(self.target_candles_per_day)
    }
}
