//! Filesystem store for ticksmith.
//!
//! [`FileStore`] implements the trade and candle store contracts of
//! `ticksmith-pipeline` with one JSON file per catalog record.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticksmith/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod file;
mod layout;

pub use file::FileStore;
