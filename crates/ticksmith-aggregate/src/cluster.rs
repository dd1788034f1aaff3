//! Directional run clustering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticksmith_calendar::floor;
use ticksmith_types::{Step, TickRule};

use crate::{Result, Sample, Totals, Trade, ensure_sorted};

/// A maximal run of consecutive rows on the same side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Timestamp of the first row of the run.
    pub timestamp: DateTime<Utc>,
    /// Seconds between the first and last row of the run.
    pub seconds: f64,
    /// Side shared by the run, `None` for rows without a side.
    pub tick_rule: Option<TickRule>,
    /// Summed volume.
    pub volume: f64,
    /// Summed notional.
    pub notional: f64,
    /// Summed ticks.
    pub ticks: u64,
    /// Summed totals, present when the input rows carry them.
    #[serde(flatten)]
    pub totals: Option<Totals>,
}

impl Cluster {
    fn from_run<T: Trade>(run: &[T]) -> Option<Self> {
        let (first, last) = (run.first()?, run.last()?);
        let elapsed = last.timestamp() - first.timestamp();
        let seconds = elapsed.num_seconds() as f64 + f64::from(elapsed.subsec_nanos()) / 1e9;

        let totals = T::HAS_TOTALS.then(|| {
            let mut totals = Totals::default();
            for row in run {
                totals += row.totals().unwrap_or_default();
            }
            totals
        });

        Some(Self {
            timestamp: first.timestamp(),
            seconds,
            tick_rule: first.tick_rule(),
            volume: run.iter().map(Trade::volume).sum(),
            notional: run.iter().map(Trade::notional).sum(),
            ticks: run.iter().map(Trade::ticks).sum(),
            totals,
        })
    }

    /// Returns the ticks of the run, taken from totals when present.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.totals.map_or(self.ticks, |totals| totals.total_ticks)
    }
}

impl Sample for Cluster {
    fn sample_time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "seconds" => Some(self.seconds),
            "volume" => Some(self.volume),
            "notional" => Some(self.notional),
            "ticks" => Some(self.ticks as f64),
            other => self.totals.and_then(|totals| totals.attribute(other)),
        }
    }
}

/// Groups maximal runs of consecutive rows that share a side.
///
/// Volume plays no part in grouping; a side change always starts a new run.
/// With `window` set, a window boundary also starts a new run. Buy-side and
/// running totals are summed only when the rows carry them.
///
/// # Errors
///
/// Returns an error if the rows are unsorted.
pub fn cluster_trades_with_time_window<T: Trade>(
    rows: &[T],
    window: Option<Step>,
) -> Result<Vec<Cluster>> {
    ensure_sorted(rows)?;

    let same_run = |a: &T, b: &T| {
        a.tick_rule() == b.tick_rule()
            && window.is_none_or(|step| floor(a.timestamp(), step) == floor(b.timestamp(), step))
    };
    Ok(rows.chunk_by(same_run).filter_map(Cluster::from_run).collect())
}
