//! Incremental aggregation pipeline for ticksmith.
//!
//! - [`TimeFrameIterator`] - Gap-aware traversal, forward or reverse
//! - [`AggregationDriver`] - Chunk-by-chunk load, aggregate and persist cycle
//! - [`TimeCandleTarget`] / [`ConstantCandleTarget`] - Candle datasets
//! - [`AdaptiveCandleTarget`] - Threshold candles sized from daily trade summaries
//! - [`TradeDataIngestor`] - Newest-first backfill of trade data
//! - [`TradeStore`] / [`CandleStore`] / [`TickSource`] - Collaborator contracts

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticksmith/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod candles;
mod driver;
mod error;
mod ingest;
mod iterator;
mod memory;
mod store;
mod summary;
mod target;

pub use cache::{CacheRecord, CacheState, DailyTarget};
pub use candles::{AdaptiveCandleTarget, ConstantCandleTarget, TimeCandleTarget};
pub use driver::{AggregationDriver, DriverConfig, RunReport};
pub use error::{PipelineError, Result, SourceError, StoreError};
pub use ingest::{IngestReport, SymbolConfig, TradeDataIngestor};
pub use iterator::{
    CandleCacheIterator, FrameWalk, TimeFrameIterator, TradeDataIterator,
    default_max_timestamp_to,
};
pub use memory::{MemoryStore, MemoryTickSource};
pub use store::{
    CandleData, CandleStore, CatalogEntry, TickBatch, TickSource, TradeData, TradeSlice,
    TradeStore,
};
pub use summary::{AdaptiveThreshold, trade_summary_name};
pub use target::{AggregationTarget, Initialized};
