//! Benchmark utilities for ticksmith.
//!
//! Generates deterministic synthetic trade streams so benchmark runs are
//! comparable across machines and commits.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use ticksmith_lib::{TickRecord, TickRule};

/// Shape of a synthetic trade stream.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Timestamp of the first trade.
    pub start: DateTime<Utc>,
    /// Number of ticks to generate.
    pub ticks: usize,
    /// Milliseconds between consecutive executions.
    pub spacing_ms: i64,
    /// Ticks sharing one execution (same instant and side).
    pub burst: usize,
    /// Seed of the price and side generator.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start: DateTime::UNIX_EPOCH + TimeDelta::days(19_723),
            ticks: 100_000,
            spacing_ms: 250,
            burst: 3,
            seed: 0x5eed,
        }
    }
}

/// xorshift64* generator.
#[derive(Debug, Clone)]
struct Rng(u64);

impl Rng {
    const fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed })
    }

    const fn next(&mut self) -> u64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        self.0.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Generates a sorted trade stream with a random-walk price.
pub fn synthetic_ticks(config: &SyntheticConfig) -> Vec<TickRecord> {
    let mut rng = Rng::new(config.seed);
    let burst = config.burst.max(1);
    let mut price = 100.0_f64;
    let mut tick_rule = TickRule::Buy;
    let mut ticks = Vec::with_capacity(config.ticks);

    for i in 0..config.ticks {
        if i % burst == 0 {
            price = (price + (rng.unit() - 0.5) * 0.1).max(0.01);
            tick_rule = if rng.unit() < 0.5 { TickRule::Buy } else { TickRule::Sell };
        }
        let execution = (i / burst) as i64;
        let timestamp = config.start + TimeDelta::milliseconds(execution * config.spacing_ms);
        let volume = 0.01 + rng.unit() * 2.0;
        ticks.push(TickRecord::new(i.to_string(), timestamp, price, volume, tick_rule));
    }

    ticks
}

/// Format a processing rate for display.
pub fn format_rate(count: usize, d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs <= 0.0 {
        return "n/a".to_string();
    }
    let rate = count as f64 / secs;
    if rate >= 1_000_000.0 {
        format!("{:.2}M/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.2}K/s", rate / 1_000.0)
    } else {
        format!("{rate:.0}/s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_ticks_are_sorted_and_deterministic() {
        let config = SyntheticConfig {
            ticks: 1_000,
            ..Default::default()
        };
        let a = synthetic_ticks(&config);
        let b = synthetic_ticks(&config);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1_000);
        assert!(a.windows(2).all(|w| w[0].sort_key() <= w[1].sort_key()));
    }

    #[test]
    fn test_bursts_merge() {
        let config = SyntheticConfig {
            ticks: 999,
            burst: 3,
            ..Default::default()
        };
        let merged = ticksmith_lib::aggregate_trades(&synthetic_ticks(&config)).unwrap();
        assert_eq!(merged.len(), 333);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(2_500_000, Duration::from_secs(1)), "2.50M/s");
        assert_eq!(format_rate(1_500, Duration::from_secs(1)), "1.50K/s");
        assert_eq!(format_rate(10, Duration::ZERO), "n/a");
    }
}
