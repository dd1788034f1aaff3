//! Gaps command implementation.

use crate::display::{RunRange, open_store};
use anyhow::Result;
use std::path::PathBuf;
use ticksmith_lib::prelude::*;

/// Print the intervals of `symbol` that ingestion would fetch, newest first.
pub(crate) fn gaps(
    data_dir: Option<PathBuf>,
    symbol: &str,
    run: RunRange,
    retry: bool,
) -> Result<()> {
    let store = open_store(data_dir)?;
    let work: Vec<TimeRange> = TradeDataIterator::new(&store, symbol)
        .iter_all(run.range, run.step, retry)
        .collect::<Result<_, _>>()?;

    if work.is_empty() {
        println!("{symbol}: no gaps in {}", run.range);
        return Ok(());
    }

    let minutes: i64 = work.iter().map(TimeRange::total_minutes).sum();
    for item in &work {
        println!("{item}  ({} min)", item.total_minutes());
    }
    println!("{symbol}: {} intervals, {minutes} minutes missing", work.len());

    Ok(())
}
