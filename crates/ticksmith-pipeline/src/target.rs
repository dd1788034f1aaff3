//! The aggregation target contract driven chunk by chunk.

use chrono::{DateTime, Utc};
use ticksmith_calendar::ExistingIndex;
use ticksmith_types::TimeRange;

use crate::{CacheRecord, CacheState, Result};

/// A target's starting point for one driver run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Initialized {
    /// Range after the target adjusted it to valid bounds.
    pub range: TimeRange,
    /// State carried into the first chunk.
    pub cache: CacheState,
}

/// A derived dataset computed incrementally from raw rows.
///
/// The driver calls [`AggregationTarget::get_data_frame`],
/// [`AggregationTarget::get_cache`], [`AggregationTarget::aggregate`],
/// [`AggregationTarget::write_data`] and [`AggregationTarget::write_cache`] in
/// that order for every chunk, oldest first. The cache record is the commit
/// marker: [`AggregationTarget::get_existing`] reports a chunk only once its
/// record is written.
pub trait AggregationTarget {
    /// Input row.
    type Row;
    /// Output sample.
    type Output;

    /// Returns the name output is stored under.
    fn name(&self) -> &str;

    /// Adjusts `range` and loads the state carried into its first chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the adjusted range is empty or the state cannot be
    /// read.
    fn initialize(&mut self, range: TimeRange, retry: bool) -> Result<Initialized>;

    /// Returns the instants inside `range` whose output is committed.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn get_existing(&mut self, range: TimeRange) -> Result<ExistingIndex>;

    /// Deletes committed output and state starting inside `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be deleted.
    fn purge(&mut self, range: TimeRange) -> Result<()>;

    /// Returns true if the inputs of `range` are available.
    ///
    /// # Errors
    ///
    /// Returns an error if the readiness lookup fails.
    fn can_aggregate(&mut self, _range: TimeRange) -> Result<bool> {
        Ok(true)
    }

    /// Loads the input rows of a chunk, ordered by time.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be read.
    fn get_data_frame(&mut self, range: TimeRange) -> Result<Vec<Self::Row>>;

    /// Merges persisted state ending at `chunk_from` into the running state.
    ///
    /// `running` is [`CacheState::Empty`] unless the previous chunk of the
    /// run ended at `chunk_from`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read.
    fn get_cache(&mut self, chunk_from: DateTime<Utc>, running: CacheState) -> Result<CacheState>;

    /// Aggregates one chunk, returning its output and the state to carry on.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows are malformed or the aggregation loses data.
    fn aggregate(
        &mut self,
        range: TimeRange,
        rows: Vec<Self::Row>,
        cache: CacheState,
    ) -> Result<(Vec<Self::Output>, CacheState)>;

    /// Persists the state produced by a chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn write_cache(&mut self, record: &CacheRecord) -> Result<()>;

    /// Persists the output of a chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn write_data(&mut self, range: TimeRange, output: Vec<Self::Output>) -> Result<()>;
}
