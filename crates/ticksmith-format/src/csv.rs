//! CSV output format.

use serde::Serialize;
use std::io::Write;
use ticksmith_aggregate::{Candle, Trade};

use crate::{FormatError, Formatter};

/// CSV formatter.
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    /// Field delimiter (default: comma).
    delimiter: char,
    /// Whether to include header row.
    include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvFormatter {
    /// Creates a new CSV formatter with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }

    /// Sets the field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether to include a header row.
    #[must_use]
    pub const fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Creates a tab-separated values (TSV) formatter.
    #[must_use]
    pub const fn tsv() -> Self {
        Self {
            delimiter: '\t',
            include_header: true,
        }
    }
}

impl Formatter for CsvFormatter {
    fn write_trades<T, W>(&self, trades: &[T], mut writer: W) -> Result<(), FormatError>
    where
        T: Trade + Serialize,
        W: Write + Send,
    {
        let d = self.delimiter;

        if self.include_header {
            writeln!(
                writer,
                "timestamp{d}nanoseconds{d}uid{d}price{d}volume{d}notional{d}ticks{d}tick_rule"
            )?;
        }

        for trade in trades {
            // Rows without a single aggressor side leave the column empty.
            let tick_rule = trade
                .tick_rule()
                .map_or_else(String::new, |rule| rule.sign().to_string());
            writeln!(
                writer,
                "{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}",
                trade.timestamp().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                trade.nanoseconds(),
                trade.uid(),
                trade.price(),
                trade.volume(),
                trade.notional(),
                trade.ticks(),
                tick_rule
            )?;
        }

        Ok(())
    }

    fn write_candles<W: Write + Send>(
        &self,
        candles: &[Candle],
        mut writer: W,
    ) -> Result<(), FormatError> {
        let d = self.delimiter;

        if self.include_header {
            writeln!(
                writer,
                "timestamp{d}open{d}high{d}low{d}close{d}volume{d}buy_volume{d}notional{d}buy_notional{d}ticks{d}buy_ticks"
            )?;
        }

        for candle in candles {
            writeln!(
                writer,
                "{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}",
                candle.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                candle.open,
                candle.high,
                candle.low,
                candle.close,
                candle.volume,
                candle.buy_volume,
                candle.notional,
                candle.buy_notional,
                candle.ticks,
                candle.buy_ticks
            )?;
        }

        Ok(())
    }

    fn extension(&self) -> &str {
        "csv"
    }
}
