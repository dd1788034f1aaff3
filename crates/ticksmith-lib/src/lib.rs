//! Incremental trade and candle aggregation over bounded historical ranges.
//!
//! This is a facade crate that re-exports functionality from the ticksmith
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use ticksmith_lib::prelude::*;
//!
//! let mut store = FileStore::with_default_path()?;
//! let range = TimeRange::new(start, end)?;
//!
//! let mut target = TimeCandleTarget::new(&mut store, "BTCUSDT", "btcusdt-5t", "5t".parse()?);
//! let report = AggregationDriver::default().run(&mut target, range, Step::DAY, false)?;
//! println!("wrote {} candles", report.samples_written);
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticksmith/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use ticksmith_types::*;

// Re-export calendar math
pub use ticksmith_calendar as calendar;
pub use ticksmith_calendar::{Direction, ExistingIndex};

// Re-export aggregation primitives
pub use ticksmith_aggregate::{
    AggregateError, AggregatedTrade, Candle, CandleAggregator, CandleBuilder, Cluster,
    SampleType, ThresholdAggregator, Trade, VolumeBar, aggregate_sum, aggregate_trades,
    cluster_trades_with_time_window, filter_by_timestamp, volume_filter_with_time_window,
};

// Re-export the pipeline
#[cfg(feature = "pipeline")]
pub use ticksmith_pipeline::{
    AdaptiveCandleTarget, AdaptiveThreshold, AggregationDriver, AggregationTarget, CacheRecord,
    CacheState, CandleCacheIterator, CandleData, CandleStore, CatalogEntry, ConstantCandleTarget,
    DailyTarget, DriverConfig, IngestReport, MemoryStore, MemoryTickSource, PipelineError,
    RunReport, SourceError, StoreError, SymbolConfig, TickBatch, TickSource, TimeCandleTarget,
    TimeFrameIterator, TradeData, TradeDataIngestor, TradeDataIterator, TradeSlice, TradeStore,
    trade_summary_name,
};

// Re-export the filesystem store
#[cfg(feature = "store")]
pub use ticksmith_store::FileStore;

// Re-export formatters
#[cfg(feature = "format")]
pub use ticksmith_format::{CsvFormatter, FormatError, Formatter, JsonFormatter, OutputFormat};

#[cfg(all(feature = "format", feature = "parquet"))]
pub use ticksmith_format::ParquetFormatter;

/// Prelude module for convenient imports.
///
/// ```
/// use ticksmith_lib::prelude::*;
/// ```
pub mod prelude {
    pub use ticksmith_types::{
        Frequency, Step, StepUnit, TickRecord, TickRule, TicksmithError, TimeRange,
        TimeRangeError,
    };

    pub use ticksmith_calendar::Direction;

    pub use ticksmith_aggregate::{Candle, SampleType, Trade};

    #[cfg(feature = "pipeline")]
    pub use ticksmith_pipeline::{
        AdaptiveCandleTarget, AdaptiveThreshold, AggregationDriver, AggregationTarget,
        CandleStore, ConstantCandleTarget, DriverConfig, MemoryStore, MemoryTickSource,
        SymbolConfig, TickSource, TimeCandleTarget, TimeFrameIterator, TradeDataIngestor,
        TradeDataIterator, TradeStore,
    };

    #[cfg(feature = "store")]
    pub use ticksmith_store::FileStore;

    #[cfg(feature = "format")]
    pub use ticksmith_format::{CsvFormatter, Formatter, JsonFormatter, OutputFormat};

    #[cfg(all(feature = "format", feature = "parquet"))]
    pub use ticksmith_format::ParquetFormatter;
}
