//! Export command implementation.

use crate::display::{Dataset, Format, open_store, write_candles, write_trades};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use ticksmith_lib::prelude::*;
use ticksmith_lib::{TradeData, filter_by_timestamp};

/// Orders rows and keeps those inside `range`.
fn sorted_within<T: Trade + Clone>(mut rows: Vec<T>, range: TimeRange) -> Vec<T> {
    rows.sort_by_key(Trade::sort_key);
    filter_by_timestamp(&rows, range)
}

fn write_rows<T>(rows: &[T], output: &Path, format: Format) -> Result<usize>
where
    T: Trade + Serialize + Sync,
{
    write_trades(rows, output, format)?;
    Ok(rows.len())
}

/// Export a stored dataset to a file.
pub(crate) fn export(
    data_dir: Option<PathBuf>,
    name: &str,
    dataset: Dataset,
    range: TimeRange,
    output: &Path,
    format: Format,
    quiet: bool,
) -> Result<()> {
    let store = open_store(data_dir)?;

    let written = match dataset {
        Dataset::Candles => {
            let candles = store.read_candles(name, range)?;
            write_candles(&candles, output, format)?;
            candles.len()
        }
        Dataset::Raw => {
            let records = store.read_trades(name, range)?;
            let rows = records.iter().flat_map(|r| r.raw.iter().cloned()).collect();
            write_rows(&sorted_within(rows, range), output, format)?
        }
        Dataset::Aggregated => {
            let records = store.read_trades(name, range)?;
            let rows = records.iter().flat_map(TradeData::trades).collect();
            write_rows(&sorted_within(rows, range), output, format)?
        }
        Dataset::Filtered => {
            let records = store.read_trades(name, range)?;
            let rows = records.iter().flat_map(|r| r.filtered.iter().cloned()).collect();
            write_rows(&sorted_within(rows, range), output, format)?
        }
    };

    tracing::info!(rows = written, output = %output.display(), "export complete");
    if !quiet {
        println!("Wrote {written} rows to {}", output.display());
    }

    Ok(())
}
