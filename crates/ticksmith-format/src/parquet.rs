//! Apache Parquet output format.

use arrow::array::{
    ArrayRef, Float64Array, Int8Array, StringArray, TimestampMicrosecondArray, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use ticksmith_aggregate::{Candle, Trade};

use crate::{FormatError, Formatter};

/// Parquet formatter.
#[derive(Debug, Clone)]
pub struct ParquetFormatter {
    /// Row group size (number of rows per group).
    row_group_size: usize,
    /// Compression codec.
    compression: Compression,
}

impl Default for ParquetFormatter {
    fn default() -> Self {
        Self {
            row_group_size: 100_000,
            compression: Compression::SNAPPY,
        }
    }
}

fn parquet_error(e: impl std::fmt::Display) -> FormatError {
    FormatError::Parquet(e.to_string())
}

fn timestamp_field() -> Field {
    Field::new(
        "timestamp",
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    )
}

impl ParquetFormatter {
    /// Creates a new Parquet formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row group size.
    #[must_use]
    pub const fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Sets the compression codec.
    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Creates the Arrow schema for trade rows.
    fn trade_schema() -> Schema {
        Schema::new(vec![
            timestamp_field(),
            Field::new("nanoseconds", DataType::UInt32, false),
            Field::new("uid", DataType::Utf8, false),
            Field::new("price", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
            Field::new("notional", DataType::Float64, false),
            Field::new("ticks", DataType::UInt64, false),
            Field::new("tick_rule", DataType::Int8, true),
        ])
    }

    /// Creates the Arrow schema for candles.
    fn candle_schema() -> Schema {
        Schema::new(vec![
            timestamp_field(),
            Field::new("open", DataType::Float64, false),
            Field::new("high", DataType::Float64, false),
            Field::new("low", DataType::Float64, false),
            Field::new("close", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
            Field::new("buy_volume", DataType::Float64, false),
            Field::new("notional", DataType::Float64, false),
            Field::new("buy_notional", DataType::Float64, false),
            Field::new("ticks", DataType::UInt64, false),
            Field::new("buy_ticks", DataType::UInt64, false),
        ])
    }

    fn trades_to_batch<T: Trade>(
        schema: &SchemaRef,
        trades: &[T],
    ) -> Result<RecordBatch, FormatError> {
        let timestamps: Vec<_> = trades
            .iter()
            .map(|t| t.timestamp().timestamp_micros())
            .collect();
        let floats = |f: fn(&T) -> f64| -> ArrayRef {
            Arc::new(trades.iter().map(f).collect::<Float64Array>())
        };

        RecordBatch::try_new(
            Arc::clone(schema),
            vec![
                Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
                Arc::new(trades.iter().map(T::nanoseconds).collect::<UInt32Array>()),
                Arc::new(StringArray::from_iter_values(trades.iter().map(T::uid))),
                floats(T::price),
                floats(T::volume),
                floats(T::notional),
                Arc::new(trades.iter().map(T::ticks).collect::<UInt64Array>()),
                Arc::new(
                    trades
                        .iter()
                        .map(|t| t.tick_rule().map(|rule| rule.sign()))
                        .collect::<Int8Array>(),
                ),
            ],
        )
        .map_err(parquet_error)
    }

    fn candles_to_batch(
        schema: &SchemaRef,
        candles: &[Candle],
    ) -> Result<RecordBatch, FormatError> {
        let timestamps: Vec<_> = candles
            .iter()
            .map(|c| c.timestamp.timestamp_micros())
            .collect();
        let floats = |f: fn(&Candle) -> f64| -> ArrayRef {
            Arc::new(candles.iter().map(f).collect::<Float64Array>())
        };
        let counts = |f: fn(&Candle) -> u64| -> ArrayRef {
            Arc::new(candles.iter().map(f).collect::<UInt64Array>())
        };

        RecordBatch::try_new(
            Arc::clone(schema),
            vec![
                Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
                floats(|c| c.open),
                floats(|c| c.high),
                floats(|c| c.low),
                floats(|c| c.close),
                floats(|c| c.volume),
                floats(|c| c.buy_volume),
                floats(|c| c.notional),
                floats(|c| c.buy_notional),
                counts(|c| c.ticks),
                counts(|c| c.buy_ticks),
            ],
        )
        .map_err(parquet_error)
    }

    fn write_batches<W, R, F>(
        &self,
        schema: Schema,
        rows: &[R],
        writer: W,
        to_batch: F,
    ) -> Result<(), FormatError>
    where
        W: Write + Send,
        F: Fn(&SchemaRef, &[R]) -> Result<RecordBatch, FormatError>,
    {
        let schema = Arc::new(schema);
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut arrow_writer =
            ArrowWriter::try_new(writer, Arc::clone(&schema), Some(props)).map_err(parquet_error)?;

        for chunk in rows.chunks(self.row_group_size.max(1)) {
            let batch = to_batch(&schema, chunk)?;
            arrow_writer.write(&batch).map_err(parquet_error)?;
        }

        arrow_writer.close().map_err(parquet_error)?;
        Ok(())
    }
}

impl Formatter for ParquetFormatter {
    fn write_trades<T, W>(&self, trades: &[T], writer: W) -> Result<(), FormatError>
    where
        T: Trade + Serialize,
        W: Write + Send,
    {
        self.write_batches(Self::trade_schema(), trades, writer, Self::trades_to_batch)
    }

    fn write_candles<W: Write + Send>(
        &self,
        candles: &[Candle],
        writer: W,
    ) -> Result<(), FormatError> {
        self.write_batches(Self::candle_schema(), candles, writer, Self::candles_to_batch)
    }

    fn extension(&self) -> &str {
        "parquet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;
    use ticksmith_aggregate::CandleBuilder;
    use ticksmith_types::{TickRecord, TickRule};

    fn create_test_tick() -> TickRecord {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap();
        TickRecord::new("1", timestamp, 42_000.5, 0.25, TickRule::Sell)
    }

    #[test]
    fn test_parquet_trades() {
        let formatter = ParquetFormatter::new();
        let ticks = vec![create_test_tick()];
        let mut output = Cursor::new(Vec::new());

        formatter.write_trades(&ticks, &mut output).unwrap();

        // Parquet files start with "PAR1" magic bytes
        let data = output.into_inner();
        assert!(data.len() > 4);
        assert_eq!(&data[0..4], b"PAR1");
    }

    #[test]
    fn test_parquet_candles_in_row_groups() {
        let tick = create_test_tick();
        let candle = CandleBuilder::new(tick.timestamp, &tick).finish();
        let formatter = ParquetFormatter::new().with_row_group_size(2);
        let mut output = Cursor::new(Vec::new());

        formatter
            .write_candles(&[candle; 5], &mut output)
            .unwrap();

        let data = output.into_inner();
        assert_eq!(&data[data.len() - 4..], b"PAR1");
    }

    #[test]
    fn test_trade_batch_columns() {
        let schema = Arc::new(ParquetFormatter::trade_schema());
        let batch = ParquetFormatter::trades_to_batch(&schema, &[create_test_tick()]).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 8);
        let rules = batch
            .column(7)
            .as_any()
            .downcast_ref::<Int8Array>()
            .unwrap();
        assert_eq!(rules.value(0), -1);
    }

    #[test]
    fn test_candle_schema() {
        let schema = ParquetFormatter::candle_schema();
        assert_eq!(schema.fields().len(), 11);
        assert!(schema.field_with_name("buy_notional").is_ok());
        assert!(schema.field_with_name("buy_ticks").is_ok());
    }
}
