//! Pipeline error types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use ticksmith_aggregate::AggregateError;
use ticksmith_types::TimeRangeError;

/// Errors raised by storage collaborators.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to determine the application data directory.
    #[error("Failed to determine application data directory")]
    NoDataDir,

    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to delete a file.
    #[error("Failed to delete file '{path}': {source}")]
    DeleteFile {
        /// The path that could not be deleted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a directory.
    #[error("Failed to read directory '{path}': {source}")]
    ReadDir {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse a stored record.
    #[error("Failed to parse record '{path}': {source}")]
    ParseJson {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize a record.
    #[error("Failed to serialize record: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a tick source.
#[derive(Error, Debug)]
#[error("Failed to fetch trades for {symbol}: {message}")]
pub struct SourceError {
    /// Symbol being fetched.
    pub symbol: String,
    /// Description of the failure.
    pub message: String,
}

impl SourceError {
    /// Creates a new source error.
    #[must_use]
    pub fn new(symbol: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while running the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A store collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A tick source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// An aggregation primitive rejected its input or lost data.
    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    /// A requested range is empty or inverted.
    #[error(transparent)]
    TimeRange(#[from] TimeRangeError),

    /// An adaptive threshold averages over no days or targets no candles.
    #[error(
        "Invalid adaptive threshold: {moving_average_days} day average, {target_candles_per_day} candles per day"
    )]
    InvalidAdaptiveThreshold {
        /// Days the moving average spans.
        moving_average_days: u32,
        /// Candles targeted per day.
        target_candles_per_day: u32,
    },

    /// Daily trade summaries needed to size a day's candles are missing.
    #[error("Missing trade summaries of {symbol} before {day}")]
    MissingSummaries {
        /// Symbol whose summaries are missing.
        symbol: String,
        /// Day being aggregated.
        day: DateTime<Utc>,
    },
}

impl PipelineError {
    /// Returns true for data-integrity faults.
    #[must_use]
    pub const fn is_integrity_fault(&self) -> bool {
        matches!(self, Self::Aggregate(err) if err.is_integrity_fault())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
