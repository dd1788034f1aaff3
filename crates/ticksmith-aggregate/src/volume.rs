//! Volume-threshold bars.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticksmith_calendar::floor;
use ticksmith_types::{Step, TickRule};

use crate::error::check_conserved;
use crate::{AggregateError, Result, Sample, Totals, Trade, ensure_sorted};

/// A bar closed by the volume filter.
///
/// When the bar closed on the volume trigger, `volume`, `notional`,
/// `tick_rule` and `ticks` are those of the closing row. A trailing bar that
/// never reached the threshold leaves them empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBar {
    /// Identifier of the closing row.
    pub uid: String,
    /// Timestamp of the closing row.
    pub timestamp: DateTime<Utc>,
    /// Nanosecond offset of the closing row.
    pub nanoseconds: u32,
    /// Price of the closing row.
    pub price: f64,
    /// Volume of the closing row.
    pub volume: Option<f64>,
    /// Notional of the closing row.
    pub notional: Option<f64>,
    /// Side of the closing row.
    pub tick_rule: Option<TickRule>,
    /// Ticks of the closing row.
    pub ticks: Option<u64>,
    /// Highest price in the bar.
    pub high: f64,
    /// Lowest price in the bar.
    pub low: f64,
    /// Totals over every row in the bar.
    #[serde(flatten)]
    pub totals: Totals,
}

impl VolumeBar {
    fn from_run<T: Trade>(run: &[T], triggered: bool) -> Option<Self> {
        let last = run.last()?;
        let (high, low) = run.iter().fold((f64::MIN, f64::MAX), |(high, low), row| {
            (high.max(row.price()), low.min(row.price()))
        });
        Some(Self {
            uid: last.uid().to_string(),
            timestamp: last.timestamp(),
            nanoseconds: last.nanoseconds(),
            price: last.price(),
            volume: triggered.then(|| last.volume()),
            notional: triggered.then(|| last.notional()),
            tick_rule: if triggered { last.tick_rule() } else { None },
            ticks: triggered.then(|| last.ticks()),
            high,
            low,
            totals: Totals::of(run),
        })
    }

    /// Returns true if the bar closed on the volume trigger.
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        self.volume.is_some()
    }
}

impl Trade for VolumeBar {
    const HAS_TOTALS: bool = true;

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
        self.volume.unwrap_or_default()
    }

    fn notional(&self) -> f64 {
        self.notional.unwrap_or_default()
    }

    fn ticks(&self) -> u64 {
        self.ticks.unwrap_or_default()
    }

    fn tick_rule(&self) -> Option<TickRule> {
        self.tick_rule
    }

    fn totals(&self) -> Option<Totals> {
        Some(self.totals)
    }
}

impl Sample for VolumeBar {
    fn sample_time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "price" => Some(self.price),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "volume" => Some(Trade::volume(self)),
            "notional" => Some(Trade::notional(self)),
            "ticks" => Some(Trade::ticks(self) as f64),
            other => self.totals.attribute(other),
        }
    }
}

/// Splits one window into bars closed by cumulative volume.
fn filter_window<T: Trade>(rows: &[T], min_volume: f64, bars: &mut Vec<VolumeBar>) {
    let mut start = 0;
    let mut accumulated = 0.0;

    for (index, row) in rows.iter().enumerate() {
        accumulated += row.volume();
        if accumulated >= min_volume {
            bars.extend(VolumeBar::from_run(&rows[start..=index], true));
            start = index + 1;
            accumulated = 0.0;
        }
    }
    bars.extend(VolumeBar::from_run(&rows[start..], false));
}

/// Downsamples rows into bars that close once cumulative volume reaches
/// `min_volume`, restarting at each window boundary.
///
/// With `window` set to `None` the whole input is one window. Rows left over
/// at the end of a window form one under-threshold bar. A `min_volume` of zero
/// closes a bar on every row.
///
/// # Errors
///
/// Returns an error if `min_volume` is negative or NaN, if the rows are
/// unsorted, or if volume is not conserved.
pub fn volume_filter_with_time_window<T: Trade>(
    rows: &[T],
    min_volume: f64,
    window: Option<Step>,
) -> Result<Vec<VolumeBar>> {
    if min_volume.is_nan() || min_volume < 0.0 {
        return Err(AggregateError::InvalidThreshold(min_volume));
    }
    ensure_sorted(rows)?;

    let mut bars = Vec::new();
    match window {
        Some(step) => {
            let same_window =
                |a: &T, b: &T| floor(a.timestamp(), step) == floor(b.timestamp(), step);
            for chunk in rows.chunk_by(same_window) {
                filter_window(chunk, min_volume, &mut bars);
            }
        }
        None => filter_window(rows, min_volume, &mut bars),
    }

    check_conserved(
        "volume",
        rows.iter().map(Trade::volume).sum(),
        bars.iter().map(|bar| bar.totals.total_volume).sum(),
    )?;
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate_trades;
    use crate::trade::fixtures::*;

    #[test]
    fn test_cumulative_trigger() {
        let ticks = vec![
            tick("a", at(0, 0), 10.0, 400.0, TickRule::Buy),
            tick("b", at(0, 1), 11.0, 700.0, TickRule::Sell),
            tick("c", at(0, 2), 12.0, 100.0, TickRule::Buy),
            tick("d", at(0, 3), 9.0, 950.0, TickRule::Buy),
            tick("e", at(0, 4), 10.0, 50.0, TickRule::Sell),
        ];
        let bars = volume_filter_with_time_window(&ticks, 1000.0, None).unwrap();
        assert_eq!(bars.len(), 3);

        assert_eq!(bars[0].uid, "b");
        assert!(bars[0].is_triggered());
        assert_eq!(bars[0].volume, Some(700.0));
        assert_eq!(bars[0].tick_rule, Some(TickRule::Sell));
        assert!((bars[0].high - 11.0).abs() < 1e-10);
        assert!((bars[0].low - 10.0).abs() < 1e-10);
        assert!((bars[0].totals.total_volume - 1100.0).abs() < 1e-10);
        assert!((bars[0].totals.total_buy_volume - 400.0).abs() < 1e-10);
        assert_eq!(bars[0].totals.total_ticks, 2);
        assert_eq!(bars[0].totals.total_buy_ticks, 1);

        assert_eq!(bars[1].uid, "d");
        assert!((bars[1].totals.total_volume - 1050.0).abs() < 1e-10);

        assert_eq!(bars[2].uid, "e");
        assert!(!bars[2].is_triggered());
        assert_eq!(bars[2].volume, None);
        assert_eq!(bars[2].tick_rule, None);
        assert!((bars[2].price - 10.0).abs() < 1e-10);
        assert!((bars[2].totals.total_volume - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_window_boundary_flushes_remainder() {
        let ticks = vec![
            tick("a", at(0, 10), 10.0, 300.0, TickRule::Buy),
            tick("b", at(0, 50), 10.0, 300.0, TickRule::Buy),
            tick("c", at(1, 5), 10.0, 300.0, TickRule::Buy),
        ];
        let bars = volume_filter_with_time_window(&ticks, 1000.0, Some(Step::MINUTE)).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars.iter().all(|bar| !bar.is_triggered()));
        assert!((bars[0].totals.total_volume - 600.0).abs() < 1e-10);
        assert!((bars[1].totals.total_volume - 300.0).abs() < 1e-10);

        let single = volume_filter_with_time_window(&ticks, 1000.0, None).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_zero_threshold_closes_every_row() {
        let ticks = vec![
            tick("a", at(0, 0), 10.0, 1.0, TickRule::Buy),
            tick("b", at(0, 1), 10.0, 2.0, TickRule::Sell),
        ];
        let bars = volume_filter_with_time_window(&ticks, 0.0, None).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars.iter().all(VolumeBar::is_triggered));
    }

    #[test]
    fn test_exact_threshold_closes() {
        let ticks = vec![
            tick("a", at(0, 0), 10.0, 500.0, TickRule::Buy),
            tick("b", at(0, 1), 10.0, 500.0, TickRule::Buy),
        ];
        let bars = volume_filter_with_time_window(&ticks, 1000.0, None).unwrap();
        assert_eq!(bars.len(), 1);
        assert!(bars[0].is_triggered());
    }

    #[test]
    fn test_invalid_threshold() {
        let ticks = vec![tick("a", at(0, 0), 10.0, 1.0, TickRule::Buy)];
        assert_eq!(
            volume_filter_with_time_window(&ticks, -1.0, None),
            Err(AggregateError::InvalidThreshold(-1.0))
        );
        assert!(volume_filter_with_time_window(&ticks, f64::NAN, None).is_err());
    }

    #[test]
    fn test_empty_input() {
        let bars = volume_filter_with_time_window::<ticksmith_types::TickRecord>(
            &[],
            1000.0,
            Some(Step::MINUTE),
        )
        .unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn test_filters_aggregated_trades() {
        let ticks = vec![
            tick("a", at(0, 0), 10.0, 600.0, TickRule::Buy),
            tick("b", at(0, 0), 10.0, 600.0, TickRule::Buy),
            tick("c", at(0, 1), 10.0, 10.0, TickRule::Sell),
        ];
        let merged = aggregate_trades(&ticks).unwrap();
        let bars = volume_filter_with_time_window(&merged, 1000.0, Some(Step::MINUTE)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ticks, Some(2));
        assert_eq!(bars[0].totals.total_ticks, 2);
        assert_eq!(bars[1].totals.total_ticks, 1);
    }

    #[test]
    fn test_volume_conserved() {
        let ticks: Vec<_> = (0..1000_u32)
            .map(|i| {
                let rule = if i % 2 == 0 { TickRule::Buy } else { TickRule::Sell };
                tick_at_ms(i64::from(i) * 250, 100.0, 0.37 * f64::from(i % 11), rule)
            })
            .collect();
        let bars = volume_filter_with_time_window(&ticks, 25.0, Some(Step::MINUTE)).unwrap();
        let input: f64 = ticks.iter().map(|t| t.volume).sum();
        let output: f64 = bars.iter().map(|b| b.totals.total_volume).sum();
        approx::assert_relative_eq!(input, output, epsilon = 1e-9);
    }
}
