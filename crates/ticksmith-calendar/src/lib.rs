//! Calendar partitioning and gap detection for ticksmith.
//!
//! - [`iter_timeframe`] - Split a range into calendar-aligned chunks, forward or reverse
//! - [`ExistingIndex`] - Minute-level index of already computed instants
//! - [`has_timestamps`] / [`iter_missing`] - Coverage test and missing sub-intervals
//! - [`decompose`] - Split a range into maximal day, hour and minute catalog entries
//! - [`refine`] / [`refine_all`] - Day to hour to minute refinement of a chunk

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticksmith/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod gaps;
mod partition;
mod refine;

pub use gaps::{ExistingIndex, decompose, has_timestamps, iter_missing};
pub use partition::{
    Direction, Partition, ceil, floor, iter_once, iter_timeframe, iter_window, next_boundary,
};
pub use refine::{Refined, refine, refine_all};
