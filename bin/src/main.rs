//! ticksmith CLI - Incremental trade and candle aggregation.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use ticksmith_lib::prelude::{DriverConfig, SymbolConfig};
use ticksmith_lib::trade_summary_name;

mod commands;
mod display;
mod logging;

use display::{Dataset, Format};

#[derive(Parser)]
#[command(name = "ticksmith")]
#[command(about = "Incremental trade and candle aggregation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Data directory. Defaults to the platform data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest trades from a CSV file, newest interval first
    Ingest {
        /// Symbol the trades are stored under
        symbol: String,

        /// CSV file with uid,timestamp,price,volume,tick_rule columns
        #[arg(short, long)]
        input: PathBuf,

        /// Start time (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        start: String,

        /// End time, exclusive (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        end: String,

        /// Outer chunk size
        #[arg(long, default_value = "1d")]
        step: String,

        /// Refetch intervals recorded as incomplete
        #[arg(long)]
        retry: bool,

        /// Keep ticks as they are instead of merging executions
        #[arg(long)]
        no_aggregate: bool,

        /// Minimum volume of a significant trade bar
        #[arg(long)]
        significant_trade_filter: Option<f64>,

        /// Keep raw ticks
        #[arg(long)]
        save_raw: bool,

        /// Keep volume-filtered bars
        #[arg(long)]
        save_filtered: bool,

        /// Keep directional clusters
        #[arg(long)]
        save_clustered: bool,
    },

    /// Build or extend a candle dataset from stored trades
    Aggregate {
        /// Name of the candle dataset
        name: String,

        /// Symbol whose trades are aggregated
        #[arg(long)]
        symbol: String,

        /// Time candle window (e.g. 1t, 5t, 1h)
        #[arg(
            short,
            long,
            conflicts_with_all = ["threshold", "sample_type", "moving_average_days"]
        )]
        window: Option<String>,

        /// Threshold candle target value
        #[arg(long, requires = "sample_type", conflicts_with = "moving_average_days")]
        threshold: Option<f64>,

        /// Size threshold candles from this many days of trade summaries
        #[arg(long, requires_all = ["sample_type", "candles_per_day"])]
        moving_average_days: Option<u32>,

        /// Candles a day of average activity closes
        #[arg(long, requires = "moving_average_days")]
        candles_per_day: Option<u32>,

        /// Quantity the threshold applies to (volume, notional, ticks)
        #[arg(long)]
        sample_type: Option<String>,

        /// Close threshold candles at every boundary of this step
        #[arg(long, conflicts_with = "window")]
        cache_reset: Option<String>,

        /// Start time (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        start: String,

        /// End time, exclusive (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        end: String,

        /// Outer chunk size
        #[arg(long, default_value = "1d")]
        step: String,

        /// Reprocess the range
        #[arg(long)]
        retry: bool,

        /// Purge cache and candles of the range before reprocessing
        #[arg(long, requires = "retry")]
        purge_on_retry: bool,
    },

    /// Summarize the trades of each day, for adaptive candles
    Summarize {
        /// Symbol whose trades are summarized
        symbol: String,

        /// Start time (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        start: String,

        /// End time, exclusive (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        end: String,

        /// Outer chunk size
        #[arg(long, default_value = "1d")]
        step: String,

        /// Reprocess the range
        #[arg(long)]
        retry: bool,
    },

    /// List the intervals ingestion would fetch
    Gaps {
        /// Symbol to inspect
        symbol: String,

        /// Start time (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        start: String,

        /// End time, exclusive (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        end: String,

        /// Outer chunk size
        #[arg(long, default_value = "1d")]
        step: String,

        /// Include intervals recorded as incomplete
        #[arg(long)]
        retry: bool,
    },

    /// Export a stored dataset
    Export {
        /// Candle dataset name, or symbol for trade datasets
        name: String,

        /// Dataset to export
        #[arg(short, long, value_enum, default_value = "candles")]
        dataset: Dataset,

        /// Start time (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        start: String,

        /// End time, exclusive (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        end: String,

        /// Output file path. Defaults to <name>.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let data_dir = cli.data_dir;
    match command {
        Commands::Ingest {
            symbol,
            input,
            start,
            end,
            step,
            retry,
            no_aggregate,
            significant_trade_filter,
            save_raw,
            save_filtered,
            save_clustered,
        } => {
            let config = SymbolConfig::new(symbol)
                .with_aggregate_trades(!no_aggregate)
                .with_significant_trade_filter(significant_trade_filter)
                .with_save_raw(save_raw)
                .with_save_filtered(save_filtered)
                .with_save_clustered(save_clustered);
            let run = display::parse_run(&start, &end, &step)?;
            commands::ingest::ingest(data_dir, config, &input, run, retry, cli.quiet).await
        }
        Commands::Aggregate {
            name,
            symbol,
            window,
            threshold,
            moving_average_days,
            candles_per_day,
            sample_type,
            cache_reset,
            start,
            end,
            step,
            retry,
            purge_on_retry,
        } => {
            let kind = commands::aggregate::CandleKind::parse(
                window.as_deref(),
                threshold,
                moving_average_days.zip(candles_per_day),
                sample_type.as_deref(),
                cache_reset.as_deref(),
            )?;
            let run = display::parse_run(&start, &end, &step)?;
            let config = DriverConfig::default().with_purge_on_retry(purge_on_retry);
            commands::aggregate::aggregate(
                data_dir, name, symbol, kind, run, retry, config, cli.quiet,
            )
            .await
        }
        Commands::Summarize {
            symbol,
            start,
            end,
            step,
            retry,
        } => {
            let run = display::parse_run(&start, &end, &step)?;
            let name = trade_summary_name(&symbol);
            commands::aggregate::aggregate(
                data_dir,
                name,
                symbol,
                commands::aggregate::CandleKind::Summary,
                run,
                retry,
                DriverConfig::default(),
                cli.quiet,
            )
            .await
        }
        Commands::Gaps {
            symbol,
            start,
            end,
            step,
            retry,
        } => {
            let run = display::parse_run(&start, &end, &step)?;
            commands::gaps::gaps(data_dir, &symbol, run, retry)
        }
        Commands::Export {
            name,
            dataset,
            start,
            end,
            output,
            format,
        } => {
            let range = display::parse_range(&start, &end)?;
            let output =
                output.unwrap_or_else(|| PathBuf::from(format!("{name}.{}", format.extension())));
            commands::export::export(data_dir, &name, dataset, range, &output, format, cli.quiet)
        }
    }
}
