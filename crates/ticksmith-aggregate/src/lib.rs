//! Trade aggregation primitives for ticksmith.
//!
//! - [`aggregate_trades`] - Merge ticks that belong to a single execution
//! - [`volume_filter_with_time_window`] - Volume-threshold bars within time windows
//! - [`cluster_trades_with_time_window`] - Directional run clusters
//! - [`aggregate_sum`] - Dense, zero-filled windowed sums
//! - [`CandleAggregator`] / [`ThresholdAggregator`] - Streaming candle builders

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticksmith/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod candle;
mod cluster;
mod error;
mod merge;
mod trade;
mod volume;
mod window;

pub use aggregator::{CandleAggregator, ThresholdAggregator};
pub use candle::{Candle, CandleBuilder, SampleType};
pub use cluster::{Cluster, cluster_trades_with_time_window};
pub use error::{AggregateError, Result};
pub use merge::{AggregatedTrade, aggregate_trades};
pub use trade::{Sample, Totals, Trade, ensure_sorted, filter_by_timestamp};
pub use volume::{VolumeBar, volume_filter_with_time_window};
pub use window::{WindowSum, aggregate_sum};
