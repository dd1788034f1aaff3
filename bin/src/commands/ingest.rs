//! Ingest command implementation.
//!
//! Reads trades from a CSV file and backfills the store with the intervals it
//! does not hold yet, newest first.

use crate::display::{RunRange, open_store, parse_time, progress_bar};
use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use ticksmith_lib::prelude::*;

/// One CSV row of the ingest input.
#[derive(Debug, Deserialize)]
struct InputRow {
    uid: String,
    timestamp: String,
    #[serde(default)]
    nanoseconds: u32,
    price: f64,
    volume: f64,
    tick_rule: i8,
}

impl InputRow {
    fn into_tick(self) -> Result<TickRecord> {
        let timestamp = parse_time(&self.timestamp)?;
        let tick_rule =
            TickRule::try_from(self.tick_rule).map_err(|e| anyhow!("trade {}: {e}", self.uid))?;
        Ok(TickRecord::new(self.uid, timestamp, self.price, self.volume, tick_rule)
            .with_nanoseconds(self.nanoseconds))
    }
}

/// Reads every trade of a CSV file.
pub(crate) async fn read_ticks(path: &Path) -> Result<Vec<TickRecord>> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = csv_async::AsyncReaderBuilder::new()
        .trim(csv_async::Trim::All)
        .create_deserializer(file);
    let mut rows = reader.deserialize::<InputRow>();

    let mut ticks = Vec::new();
    while let Some(row) = rows.next().await {
        let row = row.with_context(|| format!("Malformed row in {}", path.display()))?;
        ticks.push(row.into_tick()?);
    }
    Ok(ticks)
}

/// Ingest trades of one symbol from a CSV file.
pub(crate) async fn ingest(
    data_dir: Option<PathBuf>,
    config: SymbolConfig,
    input: &Path,
    run: RunRange,
    retry: bool,
    quiet: bool,
) -> Result<()> {
    let ticks = read_ticks(input).await?;
    tracing::info!(ticks = ticks.len(), input = %input.display(), "read input");

    let mut source = MemoryTickSource::new().with_ticks(config.code_name.clone(), ticks);
    let mut store = open_store(data_dir)?;

    let progress = progress_bar(
        quiet,
        "intervals",
        format!("{} {}", config.code_name, run.range),
    )?;
    let bar = progress.clone();

    let report = tokio::task::spawn_blocking(move || {
        TradeDataIngestor::new(&mut store, &mut source, config).run_with_progress(
            run.range,
            run.step,
            retry,
            |done, total| {
                bar.set_length(total as u64);
                bar.set_position(done as u64);
            },
        )
    })
    .await
    .context("Ingestion task failed")??;

    let finish_msg = if report.incomplete > 0 {
        format!(
            "Ingested {} trades ({} intervals incomplete)",
            report.ticks, report.incomplete
        )
    } else {
        format!("Ingested {} trades", report.ticks)
    };
    progress.finish_with_message(finish_msg);

    if !quiet {
        println!("{} intervals written", report.items);
    }

    Ok(())
}
