//! Chunk-by-chunk incremental aggregation.

use chrono::{DateTime, Utc};
use ticksmith_types::{Step, TimeRange};

use crate::{
    AggregationTarget, CacheRecord, CacheState, CandleCacheIterator, Initialized, Result,
    TimeFrameIterator, default_max_timestamp_to,
};

/// Driver configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverConfig {
    /// Delete a chunk's previous output before recomputing it on retry.
    ///
    /// Destructive; meant for local development only.
    pub purge_on_retry: bool,
    /// Instant no chunk may extend past. Defaults to the current minute.
    pub max_timestamp_to: Option<DateTime<Utc>>,
}

impl DriverConfig {
    /// Enables purging on retry.
    #[must_use]
    pub const fn with_purge_on_retry(mut self, purge_on_retry: bool) -> Self {
        self.purge_on_retry = purge_on_retry;
        self
    }

    /// Sets the instant no chunk may extend past.
    #[must_use]
    pub const fn with_max_timestamp_to(mut self, max_timestamp_to: DateTime<Utc>) -> Self {
        self.max_timestamp_to = Some(max_timestamp_to);
        self
    }
}

/// Summary of one driver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Chunks aggregated and persisted.
    pub chunks_processed: usize,
    /// Output samples persisted.
    pub samples_written: usize,
    /// Chunks skipped because their inputs were not ready.
    pub chunks_skipped: usize,
}

/// Runs an [`AggregationTarget`] over the chunks of a range that are missing.
#[derive(Debug, Clone, Default)]
pub struct AggregationDriver {
    config: DriverConfig,
}

impl AggregationDriver {
    /// Creates a new driver.
    #[must_use]
    pub const fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Returns the driver configuration.
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Aggregates every missing chunk of `range`, walking it in chunks of `step`.
    ///
    /// # Errors
    ///
    /// Returns the first collaborator or aggregation error. Chunks committed
    /// before the error stay committed. The failing chunk is not committed:
    /// its cache record, which the catalog counts, is written last.
    pub fn run<T: AggregationTarget>(
        &self,
        target: &mut T,
        range: TimeRange,
        step: Step,
        retry: bool,
    ) -> Result<RunReport> {
        self.run_with_progress(target, range, step, retry, |_, _| {})
    }

    /// Like [`AggregationDriver::run`], calling `progress(done, total)` after
    /// each chunk.
    ///
    /// # Errors
    ///
    /// See [`AggregationDriver::run`].
    pub fn run_with_progress<T, F>(
        &self,
        target: &mut T,
        range: TimeRange,
        step: Step,
        retry: bool,
        mut progress: F,
    ) -> Result<RunReport>
    where
        T: AggregationTarget,
        F: FnMut(usize, usize),
    {
        let span =
            tracing::info_span!("aggregate", dataset = target.name(), %range, %step, retry);
        let _guard = span.enter();

        let max_to = self
            .config
            .max_timestamp_to
            .unwrap_or_else(default_max_timestamp_to);
        let Some(range) = range.clamp_end(max_to) else {
            tracing::debug!(%max_to, "range starts after the last complete minute");
            return Ok(RunReport::default());
        };

        let Initialized { range, mut cache } = target.initialize(range, retry)?;

        let (mut work, vetoed) = {
            let mut iterator = CandleCacheIterator::new(target, self.config.purge_on_retry)
                .with_max_timestamp_to(max_to);
            let mut walk = iterator.iter_all(range, step, retry);
            let work = walk.by_ref().collect::<Result<Vec<_>>>()?;
            (work, walk.vetoed())
        };
        work.sort_by_key(TimeRange::start);

        let mut report = RunReport {
            chunks_skipped: vetoed,
            ..RunReport::default()
        };
        let total = work.len();
        tracing::debug!(chunks = total, "resolved missing chunks");

        // State only carries into a chunk that starts where it was produced.
        let mut carried_to = range.start();
        for (index, chunk) in work.into_iter().enumerate() {
            let rows = target.get_data_frame(chunk)?;
            let running = if chunk.start() == carried_to {
                cache
            } else {
                tracing::debug!(%chunk, "chunk does not continue the previous one");
                CacheState::Empty
            };
            cache = target.get_cache(chunk.start(), running)?;

            let (samples, next) = match target.aggregate(chunk, rows, cache) {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(%chunk, error = %err, "aggregation failed, chunk not written");
                    return Err(err);
                }
            };

            let written = samples.len();
            target.write_data(chunk, samples)?;
            target.write_cache(&CacheRecord::new(chunk, next))?;
            tracing::debug!(%chunk, samples = written, "chunk committed");

            cache = next;
            carried_to = chunk.end();
            report.chunks_processed += 1;
            report.samples_written += written;
            progress(index + 1, total);
        }

        tracing::info!(
            chunks = report.chunks_processed,
            samples = report.samples_written,
            skipped = report.chunks_skipped,
            "aggregation complete"
        );
        Ok(report)
    }
}
