//! Backfill of raw and derived trade data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticksmith_aggregate::{
    AggregatedTrade, aggregate_trades, cluster_trades_with_time_window, ensure_sorted,
    filter_by_timestamp, volume_filter_with_time_window,
};
use ticksmith_types::{Step, TimeRange};

use crate::{Result, TickSource, TimeFrameIterator, TradeDataIterator, TradeSlice, TradeStore};

/// What to derive and keep for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    /// Symbol the data is stored under.
    pub code_name: String,
    /// Merge ticks belonging to one execution.
    pub aggregate_trades: bool,
    /// Minimum volume of a significant trade bar, if filtering.
    pub significant_trade_filter: Option<f64>,
    /// Keep raw ticks.
    pub save_raw: bool,
    /// Keep merged executions.
    pub save_aggregated: bool,
    /// Keep volume-filtered bars.
    pub save_filtered: bool,
    /// Keep directional clusters.
    pub save_clustered: bool,
}

impl SymbolConfig {
    /// Creates a config that merges executions and keeps only those.
    #[must_use]
    pub fn new(code_name: impl Into<String>) -> Self {
        Self {
            code_name: code_name.into(),
            aggregate_trades: true,
            significant_trade_filter: None,
            save_raw: false,
            save_aggregated: true,
            save_filtered: false,
            save_clustered: false,
        }
    }

    /// Sets whether ticks are merged into executions.
    #[must_use]
    pub const fn with_aggregate_trades(mut self, aggregate_trades: bool) -> Self {
        self.aggregate_trades = aggregate_trades;
        self
    }

    /// Sets the significant trade filter.
    #[must_use]
    pub const fn with_significant_trade_filter(mut self, min_volume: Option<f64>) -> Self {
        self.significant_trade_filter = min_volume;
        self
    }

    /// Sets whether raw ticks are kept.
    #[must_use]
    pub const fn with_save_raw(mut self, save_raw: bool) -> Self {
        self.save_raw = save_raw;
        self
    }

    /// Sets whether filtered bars are kept.
    #[must_use]
    pub const fn with_save_filtered(mut self, save_filtered: bool) -> Self {
        self.save_filtered = save_filtered;
        self
    }

    /// Sets whether clusters are kept.
    #[must_use]
    pub const fn with_save_clustered(mut self, save_clustered: bool) -> Self {
        self.save_clustered = save_clustered;
        self
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Intervals fetched and written.
    pub items: usize,
    /// Ticks received.
    pub ticks: usize,
    /// Intervals the source reported as incomplete.
    pub incomplete: usize,
}

/// Fetches missing trade data, newest first, and writes it to a store.
#[derive(Debug)]
pub struct TradeDataIngestor<'a, S, T> {
    store: &'a mut S,
    source: &'a mut T,
    config: SymbolConfig,
    max_to: Option<DateTime<Utc>>,
}

impl<'a, S: TradeStore, T: TickSource> TradeDataIngestor<'a, S, T> {
    /// Creates a new ingestor.
    #[must_use]
    pub const fn new(store: &'a mut S, source: &'a mut T, config: SymbolConfig) -> Self {
        Self {
            store,
            source,
            config,
            max_to: None,
        }
    }

    /// Overrides the instant work may not extend past.
    #[must_use]
    pub const fn with_max_timestamp_to(mut self, max_to: DateTime<Utc>) -> Self {
        self.max_to = Some(max_to);
        self
    }

    /// Returns the symbol config.
    #[must_use]
    pub const fn config(&self) -> &SymbolConfig {
        &self.config
    }

    /// Returns the intervals of `range` that would be fetched.
    ///
    /// # Errors
    ///
    /// Returns an error if the trade catalog cannot be read.
    pub fn missing(&self, range: TimeRange, step: Step, retry: bool) -> Result<Vec<TimeRange>> {
        let mut iterator = TradeDataIterator::new(&*self.store, &self.config.code_name);
        if let Some(max_to) = self.max_to {
            iterator = iterator.with_max_timestamp_to(max_to);
        }
        iterator.iter_all(range, step, retry).collect()
    }

    /// Fetches and writes every missing interval of `range`.
    ///
    /// # Errors
    ///
    /// Returns the first source, store or aggregation error. Intervals written
    /// before the error stay written.
    pub fn run(&mut self, range: TimeRange, step: Step, retry: bool) -> Result<IngestReport> {
        self.run_with_progress(range, step, retry, |_, _| {})
    }

    /// Like [`TradeDataIngestor::run`], calling `progress(done, total)` after
    /// each interval.
    ///
    /// # Errors
    ///
    /// See [`TradeDataIngestor::run`].
    pub fn run_with_progress<F>(
        &mut self,
        range: TimeRange,
        step: Step,
        retry: bool,
        mut progress: F,
    ) -> Result<IngestReport>
    where
        F: FnMut(usize, usize),
    {
        let span = tracing::info_span!("ingest", symbol = %self.config.code_name, %range, retry);
        let _guard = span.enter();

        let work = self.missing(range, step, retry)?;
        let total = work.len();
        tracing::debug!(items = total, "resolved missing intervals");

        let mut report = IngestReport::default();
        for (index, item) in work.into_iter().enumerate() {
            let (slice, ticks) = self.fetch(item)?;
            if !slice.ok {
                tracing::warn!(%item, "source returned incomplete data");
                report.incomplete += 1;
            }
            self.store.write_trades(&self.config.code_name, &slice)?;

            report.items += 1;
            report.ticks += ticks;
            progress(index + 1, total);
        }

        tracing::info!(
            items = report.items,
            ticks = report.ticks,
            incomplete = report.incomplete,
            "ingestion complete"
        );
        Ok(report)
    }

    /// Fetches one interval and derives everything the config asks for.
    fn fetch(&mut self, item: TimeRange) -> Result<(TradeSlice, usize)> {
        let config = &self.config;
        let batch = self.source.fetch(&config.code_name, item)?;
        let ticks = filter_by_timestamp(&batch.ticks, item);
        ensure_sorted(&ticks)?;

        let aggregated = if config.aggregate_trades {
            aggregate_trades(&ticks)?
        } else {
            ticks.iter().map(AggregatedTrade::from).collect()
        };

        let filtered = config
            .significant_trade_filter
            .map(|min_volume| {
                volume_filter_with_time_window(&aggregated, min_volume, Some(Step::MINUTE))
            })
            .transpose()?
            .unwrap_or_default();

        let clustered = if !config.save_clustered {
            Vec::new()
        } else if config.significant_trade_filter.is_some() {
            cluster_trades_with_time_window(&filtered, Some(Step::MINUTE))?
        } else {
            cluster_trades_with_time_window(&aggregated, Some(Step::MINUTE))?
        };

        tracing::debug!(
            %item,
            ticks = ticks.len(),
            aggregated = aggregated.len(),
            filtered = filtered.len(),
            clustered = clustered.len(),
            "fetched interval"
        );

        let count = ticks.len();
        let mut slice = TradeSlice::new(item, batch.complete);
        if config.save_raw {
            slice.raw = ticks;
        }
        if config.save_aggregated {
            slice.aggregated = aggregated;
        }
        if config.save_filtered {
            slice.filtered = filtered;
        }
        slice.clustered = clustered;
        Ok((slice, count))
    }
}
