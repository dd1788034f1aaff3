//! File naming of catalog records.

use chrono::{DateTime, NaiveDateTime, Utc};
use ticksmith_types::{Frequency, TimeRange};

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";
const EXTENSION: &str = ".json";
const PARTIAL: &str = ".partial";

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Name of a trade record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TradeFile {
    pub(crate) start: DateTime<Utc>,
    pub(crate) frequency: Frequency,
    pub(crate) ok: bool,
}

impl TradeFile {
    pub(crate) fn file_name(&self) -> String {
        let marker = if self.ok { "" } else { PARTIAL };
        format!(
            "{}-{}{marker}{EXTENSION}",
            format_timestamp(self.start),
            self.frequency.code()
        )
    }

    pub(crate) fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(EXTENSION)?;
        let (stem, ok) = stem
            .strip_suffix(PARTIAL)
            .map_or((stem, true), |stem| (stem, false));
        let (start, code) = stem.split_once('-')?;
        Some(Self {
            start: parse_timestamp(start)?,
            frequency: Frequency::from_code(code.parse().ok()?)?,
            ok,
        })
    }

    /// Returns the widest interval the record can hold.
    pub(crate) fn span(&self) -> Option<TimeRange> {
        TimeRange::starting_at(self.start, self.frequency.step().duration()).ok()
    }
}

/// Name of a chunk record file.
pub(crate) fn chunk_file_name(range: TimeRange) -> String {
    format!(
        "{}_{}{EXTENSION}",
        format_timestamp(range.start()),
        format_timestamp(range.end())
    )
}

/// Parses the range of a chunk record file.
pub(crate) fn parse_chunk_file_name(name: &str) -> Option<TimeRange> {
    let (start, end) = name.strip_suffix(EXTENSION)?.split_once('_')?;
    TimeRange::try_new(parse_timestamp(start)?, parse_timestamp(end)?)
}
