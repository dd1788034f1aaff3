//! Error types for ticksmith.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for ticksmith operations.
pub type Result<T> = std::result::Result<T, TicksmithError>;

/// Errors raised while building or validating core values.
#[derive(Error, Debug)]
pub enum TicksmithError {
    /// Invalid time range.
    #[error(transparent)]
    TimeRange(#[from] TimeRangeError),

    /// Invalid step string.
    #[error(transparent)]
    Step(#[from] StepParseError),

    /// Invalid tick rule value.
    #[error(transparent)]
    TickRule(#[from] InvalidTickRule),

    /// Invalid frequency code.
    #[error(transparent)]
    Frequency(#[from] InvalidFrequency),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error for invalid time ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    /// Start and end are the same instant.
    #[error("Empty time range at {at}")]
    Empty {
        /// The instant used for both bounds.
        at: DateTime<Utc>,
    },

    /// Start is after end.
    #[error("Invalid time range: {start} > {end}")]
    Inverted {
        /// The start instant.
        start: DateTime<Utc>,
        /// The end instant.
        end: DateTime<Utc>,
    },
}

/// Error returned when parsing an invalid step string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepParseError {
    /// The string is not a recognised step.
    #[error("invalid step '{0}', expected e.g. 1t, 5t, 1h, 4h, 1d")]
    Invalid(String),

    /// The step count is zero.
    #[error("step '{0}' must have a positive count")]
    ZeroCount(String),

    /// The step does not tile its parent period.
    #[error("step '{0}' does not evenly divide its parent period")]
    Misaligned(String),
}

/// Error returned for a tick rule other than `1` or `-1`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid tick rule {0}, expected 1 or -1")]
pub struct InvalidTickRule(pub i8);

/// Error returned for an unknown frequency code.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid frequency code {0}, expected 1, 60 or 1440")]
pub struct InvalidFrequency(pub u32);
