//! CLI command implementations.

pub(crate) mod aggregate;
pub(crate) mod export;
pub(crate) mod gaps;
pub(crate) mod ingest;
