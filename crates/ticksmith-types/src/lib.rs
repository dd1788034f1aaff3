//! Core types for the ticksmith trade aggregation pipeline.
//!
//! This crate provides the fundamental data structures used throughout ticksmith:
//!
//! - [`TickRecord`] - A single trade with price, volume, notional and aggressor side
//! - [`TickRule`] - Aggressor side of a trade (+1 buy, -1 sell)
//! - [`TimeRange`] - Half-open `[start, end)` time interval
//! - [`Step`] - Calendar step such as `1d`, `1h`, `1t` or `5t`
//! - [`Frequency`] - Catalog granularity code (minute, hour, day)

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticksmith/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod frequency;
mod step;
mod tick;
mod time_range;

pub use error::{
    InvalidFrequency, InvalidTickRule, Result, StepParseError, TicksmithError, TimeRangeError,
};
pub use frequency::Frequency;
pub use step::{Step, StepUnit};
pub use tick::{TickRecord, TickRule};
pub use time_range::TimeRange;
