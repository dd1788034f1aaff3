//! Merging ticks that belong to a single execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticksmith_types::{TickRecord, TickRule};

use crate::error::check_conserved;
use crate::{Result, Sample, Trade, ensure_sorted};

/// One logical execution: a run of ticks sharing the same instant and side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedTrade {
    /// Identifier of the first tick of the run.
    pub uid: String,
    /// Timestamp of the run.
    pub timestamp: DateTime<Utc>,
    /// Nanosecond offset of the run.
    pub nanoseconds: u32,
    /// Price of the last tick of the run.
    pub price: f64,
    /// Summed volume.
    pub volume: f64,
    /// Summed notional.
    pub notional: f64,
    /// Number of ticks merged.
    pub ticks: u64,
    /// Aggressor side.
    pub tick_rule: TickRule,
    /// Symbol, when the input carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl AggregatedTrade {
    fn from_run(run: &[TickRecord]) -> Option<Self> {
        let (first, last) = (run.first()?, run.last()?);
        let (volume, notional) = if run.len() > 1 {
            (
                run.iter().map(|t| t.volume).sum(),
                run.iter().map(|t| t.notional).sum(),
            )
        } else {
            (last.volume, last.notional)
        };
        Some(Self {
            uid: first.uid.clone(),
            timestamp: last.timestamp,
            nanoseconds: last.nanoseconds,
            price: last.price,
            volume,
            notional,
            ticks: run.len() as u64,
            tick_rule: last.tick_rule,
            symbol: last.symbol.clone(),
        })
    }
}

impl From<&TickRecord> for AggregatedTrade {
    fn from(tick: &TickRecord) -> Self {
        Self {
            uid: tick.uid.clone(),
            timestamp: tick.timestamp,
            nanoseconds: tick.nanoseconds,
            price: tick.price,
            volume: tick.volume,
            notional: tick.notional,
            ticks: 1,
            tick_rule: tick.tick_rule,
            symbol: tick.symbol.clone(),
        }
    }
}

impl Trade for AggregatedTrade {
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

    fn ticks(&self) -> u64 {
        self.ticks
    }

    fn tick_rule(&self) -> Option<TickRule> {
        Some(self.tick_rule)
    }
}

impl Sample for AggregatedTrade {
    fn sample_time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "price" => Some(self.price),
            "volume" => Some(self.volume),
            "notional" => Some(self.notional),
            "ticks" => Some(self.ticks as f64),
            _ => None,
        }
    }
}

/// Returns true if two ticks are part of the same execution.
fn same_execution(a: &TickRecord, b: &TickRecord) -> bool {
    a.timestamp == b.timestamp
        && a.nanoseconds == b.nanoseconds
        && a.tick_rule == b.tick_rule
        && a.symbol == b.symbol
}

/// Merges runs of ticks that share `(timestamp, nanoseconds, tick_rule, symbol)`.
///
/// Each run collapses to one [`AggregatedTrade`] carrying the first tick's
/// uid, the last tick's price, and the summed volume and notional.
///
/// # Errors
///
/// Returns an error if the ticks are unsorted or if volume or notional is not
/// conserved.
pub fn aggregate_trades(ticks: &[TickRecord]) -> Result<Vec<AggregatedTrade>> {
    ensure_sorted(ticks)?;

    let merged: Vec<_> = ticks
        .chunk_by(same_execution)
        .filter_map(AggregatedTrade::from_run)
        .collect();

    check_conserved(
        "volume",
        ticks.iter().map(|t| t.volume).sum(),
        merged.iter().map(|t| t.volume).sum(),
    )?;
    check_conserved(
        "notional",
        ticks.iter().map(|t| t.notional).sum(),
        merged.iter().map(|t| t.notional).sum(),
    )?;
    Ok(merged)
}
