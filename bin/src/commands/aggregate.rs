//! Aggregate command implementation.

use crate::display::{RunRange, open_store, progress_bar};
use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use ticksmith_lib::prelude::*;
use ticksmith_lib::{PipelineError, RunReport};

/// Kind of candle a dataset holds.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CandleKind {
    /// Fixed time windows.
    Time(Step),
    /// Candles closing at an accumulated threshold.
    Constant {
        sample_type: SampleType,
        threshold: f64,
        cache_reset: Option<Step>,
    },
    /// Threshold candles sized from daily trade summaries.
    Adaptive {
        sample_type: SampleType,
        threshold: AdaptiveThreshold,
        cache_reset: Option<Step>,
    },
    /// Daily trade summaries.
    Summary,
}

impl CandleKind {
    /// Builds the candle kind from the command line options.
    ///
    /// `adaptive` holds the moving average days and the candles per day.
    pub(crate) fn parse(
        window: Option<&str>,
        threshold: Option<f64>,
        adaptive: Option<(u32, u32)>,
        sample_type: Option<&str>,
        cache_reset: Option<&str>,
    ) -> Result<Self> {
        let parse_sample_type = || {
            sample_type
                .unwrap_or("volume")
                .parse::<SampleType>()
                .map_err(anyhow::Error::msg)
        };
        let cache_reset = cache_reset
            .map(|s| {
                s.parse::<Step>()
                    .with_context(|| format!("Invalid cache reset: {s}"))
            })
            .transpose()?;

        match (window, threshold, adaptive) {
            (Some(window), None, None) => {
                if cache_reset.is_some() {
                    bail!("--cache-reset applies to threshold candles only");
                }
                let window = window
                    .parse::<Step>()
                    .with_context(|| format!("Invalid window: {window}"))?;
                Ok(Self::Time(window))
            }
            (None, Some(threshold), None) => Ok(Self::Constant {
                sample_type: parse_sample_type()?,
                threshold,
                cache_reset,
            }),
            (None, None, Some((days, per_day))) => Ok(Self::Adaptive {
                sample_type: parse_sample_type()?,
                threshold: AdaptiveThreshold::new(days, per_day)?,
                cache_reset,
            }),
            _ => bail!("Pass one of --window, --threshold or --moving-average-days"),
        }
    }
}

fn drive<T: AggregationTarget>(
    target: &mut T,
    run: RunRange,
    retry: bool,
    config: DriverConfig,
    bar: &ProgressBar,
) -> Result<RunReport, PipelineError> {
    AggregationDriver::new(config).run_with_progress(
        target,
        run.range,
        run.step,
        retry,
        |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        },
    )
}

/// Build or extend the candle dataset `name` from the trades of `symbol`.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn aggregate(
    data_dir: Option<std::path::PathBuf>,
    name: String,
    symbol: String,
    kind: CandleKind,
    run: RunRange,
    retry: bool,
    config: DriverConfig,
    quiet: bool,
) -> Result<()> {
    let mut store = open_store(data_dir)?;
    let progress = progress_bar(quiet, "chunks", format!("{name} {}", run.range))?;
    let bar = progress.clone();

    let report = tokio::task::spawn_blocking(move || match kind {
        CandleKind::Time(window) => {
            let mut target = TimeCandleTarget::new(&mut store, symbol, name, window);
            drive(&mut target, run, retry, config, &bar)
        }
        CandleKind::Constant {
            sample_type,
            threshold,
            cache_reset,
        } => {
            let mut target =
                ConstantCandleTarget::new(&mut store, symbol, name, sample_type, threshold)?
                    .with_cache_reset(cache_reset);
            drive(&mut target, run, retry, config, &bar)
        }
        CandleKind::Adaptive {
            sample_type,
            threshold,
            cache_reset,
        } => {
            let mut target =
                AdaptiveCandleTarget::new(&mut store, symbol, name, sample_type, threshold)
                    .with_cache_reset(cache_reset);
            drive(&mut target, run, retry, config, &bar)
        }
        CandleKind::Summary => {
            let mut target = TimeCandleTarget::trade_summary(&mut store, symbol);
            drive(&mut target, run, retry, config, &bar)
        }
    })
    .await
    .context("Aggregation task failed")??;

    progress.finish_with_message(format!("Wrote {} candles", report.samples_written));

    if !quiet {
        println!(
            "{} chunks processed, {} skipped awaiting trades",
            report.chunks_processed, report.chunks_skipped
        );
    }

    Ok(())
}
