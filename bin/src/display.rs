//! Argument parsing helpers and output writing for the ticksmith CLI.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use ticksmith_lib::prelude::*;

/// Output format for exported data.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Csv,
    Json,
    Ndjson,
    Parquet,
}

impl Format {
    /// Returns the file extension for this format.
    pub(crate) const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Parquet => "parquet",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Stored dataset to export.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Dataset {
    /// Candles of a candle dataset.
    Candles,
    /// Raw ticks of a symbol.
    Raw,
    /// Merged executions of a symbol.
    Aggregated,
    /// Volume-filtered bars of a symbol.
    Filtered,
}

/// A range to process and the outer chunk size to walk it with.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunRange {
    pub(crate) range: TimeRange,
    pub(crate) step: Step,
}

/// Parses a `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` or RFC 3339 timestamp as UTC.
pub(crate) fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }
    bail!("Invalid timestamp: {s} (expected YYYY-MM-DD or RFC 3339)")
}

/// Parses a half-open `[start, end)` range.
pub(crate) fn parse_range(start: &str, end: &str) -> Result<TimeRange> {
    let (start, end) = (parse_time(start)?, parse_time(end)?);
    TimeRange::new(start, end).with_context(|| format!("Invalid range {start} -> {end}"))
}

/// Parses a range and its chunk step.
pub(crate) fn parse_run(start: &str, end: &str, step: &str) -> Result<RunRange> {
    let range = parse_range(start, end)?;
    let step = step
        .parse::<Step>()
        .with_context(|| format!("Invalid step: {step}"))?;
    Ok(RunRange { range, step })
}

/// Opens the store under `data_dir`, or under the platform data directory.
pub(crate) fn open_store(data_dir: Option<PathBuf>) -> Result<FileStore> {
    let store = match data_dir {
        Some(path) => FileStore::new(path),
        None => FileStore::with_default_path(),
    };
    store.context("Failed to open data directory")
}

/// Creates a progress bar counting work items, hidden in quiet mode.
pub(crate) fn progress_bar(quiet: bool, unit: &str, message: String) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} ({{percent}}%) {{msg}}"
            ))
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );
    pb.set_message(message);
    Ok(pb)
}

/// Write trade rows to a file in the specified format.
pub(crate) fn write_trades<T>(trades: &[T], output: &Path, format: Format) -> Result<()>
where
    T: Trade + Serialize + Sync,
{
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let writer = BufWriter::new(file);

    match format {
        Format::Csv => CsvFormatter::new().write_trades(trades, writer)?,
        Format::Json => JsonFormatter::new().write_trades(trades, writer)?,
        Format::Ndjson => JsonFormatter::ndjson().write_trades(trades, writer)?,
        Format::Parquet => {
            #[cfg(feature = "parquet")]
            {
                ParquetFormatter::new().write_trades(trades, writer)?;
            }
            #[cfg(not(feature = "parquet"))]
            {
                bail!("Parquet support not compiled in");
            }
        }
    }

    Ok(())
}

/// Write candles to a file in the specified format.
pub(crate) fn write_candles(candles: &[Candle], output: &Path, format: Format) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let writer = BufWriter::new(file);

    match format {
        Format::Csv => CsvFormatter::new().write_candles(candles, writer)?,
        Format::Json => JsonFormatter::new().write_candles(candles, writer)?,
        Format::Ndjson => JsonFormatter::ndjson().write_candles(candles, writer)?,
        Format::Parquet => {
            #[cfg(feature = "parquet")]
            {
                ParquetFormatter::new().write_candles(candles, writer)?;
            }
            #[cfg(not(feature = "parquet"))]
            {
                bail!("Parquet support not compiled in");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_time() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(parse_time("2024-03-09").unwrap(), midnight);
        assert_eq!(parse_time("2024-03-09T00:00:00Z").unwrap(), midnight);
        assert_eq!(parse_time("2024-03-09T01:00:00+01:00").unwrap(), midnight);
        assert_eq!(
            parse_time("2024-03-09T13:05").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 9, 13, 5, 0).unwrap()
        );
        assert!(parse_time("09/03/2024").is_err());
    }

    #[test]
    fn test_parse_run() {
        let run = parse_run("2024-03-09", "2024-03-11", "4h").unwrap();
        assert_eq!(run.range.total_minutes(), 2 * 1440);
        assert_eq!(run.step.to_string(), "4h");
        assert!(parse_run("2024-03-11", "2024-03-09", "1d").is_err());
        assert!(parse_run("2024-03-09", "2024-03-11", "1w").is_err());
    }
}
