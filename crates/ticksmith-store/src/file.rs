//! Filesystem-backed trade and candle store.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::{BaseDirs, ProjectDirs};
use serde::Serialize;
use serde::de::DeserializeOwned;
use ticksmith_aggregate::Candle;
use ticksmith_calendar::decompose;
use ticksmith_pipeline::{
    CacheRecord, CandleData, CandleStore, CatalogEntry, StoreError, TradeData, TradeSlice,
    TradeStore,
};
use ticksmith_types::TimeRange;

use crate::layout::{TradeFile, chunk_file_name, parse_chunk_file_name};

type Result<T> = std::result::Result<T, StoreError>;

/// Trade and candle records stored as JSON files under a data directory.
///
/// Trade records live in `trades/<symbol>/`, candle cache states and candle
/// output in `candles/<name>/cache/` and `candles/<name>/data/`.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `base_path`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(base_path: PathBuf) -> Result<Self> {
        create_dir(&base_path)?;
        Ok(Self { base_path })
    }

    /// Returns the default data directory.
    ///
    /// Uses the `directories` crate to find the appropriate location:
    /// - Linux: `~/.local/share/ticksmith/`
    /// - macOS: `~/Library/Application Support/ticksmith/`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\ticksmith\`
    ///
    /// Falls back to `~/.ticksmith/` if the platform-specific location
    /// cannot be determined.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "ticksmith").map_or_else(dirs_fallback, |proj_dirs| {
            proj_dirs.data_dir().to_path_buf()
        })
    }

    /// Creates a store at the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_default_path() -> Result<Self> {
        Self::new(Self::default_path())
    }

    /// Returns the data directory.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn trades_dir(&self, symbol: &str) -> PathBuf {
        self.base_path.join("trades").join(symbol)
    }

    fn cache_dir(&self, name: &str) -> PathBuf {
        self.base_path.join("candles").join(name).join("cache")
    }

    fn data_dir(&self, name: &str) -> PathBuf {
        self.base_path.join("candles").join(name).join("data")
    }

    fn trade_files(&self, symbol: &str) -> Result<Vec<(TradeFile, PathBuf)>> {
        Ok(list_dir(&self.trades_dir(symbol))?
            .into_iter()
            .filter_map(|(name, path)| TradeFile::parse(&name).map(|file| (file, path)))
            .collect())
    }

    fn chunk_files(dir: &Path) -> Result<Vec<(TimeRange, PathBuf)>> {
        let mut files: Vec<_> = list_dir(dir)?
            .into_iter()
            .filter_map(|(name, path)| parse_chunk_file_name(&name).map(|range| (range, path)))
            .collect();
        files.sort_by_key(|(range, _)| range.start());
        Ok(files)
    }

    /// Deletes chunk files in `dir` starting inside `range`.
    fn clear_chunks(dir: &Path, range: TimeRange) -> Result<()> {
        for (chunk, path) in Self::chunk_files(dir)? {
            if range.contains(chunk.start()) {
                remove_file(&path)?;
            }
        }
        Ok(())
    }
}

impl TradeStore for FileStore {
    fn existing_trades(
        &self,
        symbol: &str,
        range: TimeRange,
        retry: bool,
    ) -> Result<Vec<CatalogEntry>> {
        let mut entries: Vec<_> = self
            .trade_files(symbol)?
            .into_iter()
            .filter(|(file, _)| range.contains(file.start) && (!retry || file.ok))
            .map(|(file, _)| (file.start, file.frequency))
            .collect();
        entries.sort_unstable_by_key(|(start, _)| *start);
        Ok(entries)
    }

    fn read_trades(&self, symbol: &str, range: TimeRange) -> Result<Vec<TradeData>> {
        let mut records: Vec<TradeData> = self
            .trade_files(symbol)?
            .into_iter()
            .filter(|(file, _)| {
                file.span()
                    .is_some_and(|span| span.intersect(&range).is_some())
            })
            .map(|(_, path)| read_record(&path))
            .collect::<Result<_>>()?;
        records.retain(|record| record.range.intersect(&range).is_some());
        records.sort_by_key(|record| record.range.start());
        Ok(records)
    }

    fn write_trades(&mut self, symbol: &str, slice: &TradeSlice) -> Result<()> {
        let dir = self.trades_dir(symbol);
        for (file, path) in self.trade_files(symbol)? {
            if slice.range.contains(file.start) {
                remove_file(&path)?;
            }
        }

        create_dir(&dir)?;
        for record in slice.split() {
            let file = TradeFile {
                start: record.range.start(),
                frequency: record.frequency,
                ok: record.ok,
            };
            write_record(&dir.join(file.file_name()), &record)?;
        }
        tracing::debug!(symbol, range = %slice.range, ok = slice.ok, "trades written");
        Ok(())
    }
}

impl CandleStore for FileStore {
    fn existing_cache(&self, name: &str, range: TimeRange) -> Result<Vec<CatalogEntry>> {
        Ok(Self::chunk_files(&self.cache_dir(name))?
            .into_iter()
            .filter(|(chunk, _)| range.contains(chunk.start()))
            .flat_map(|(chunk, _)| decompose(chunk))
            .collect())
    }

    fn read_cache(&self, name: &str, end: DateTime<Utc>) -> Result<Option<CacheRecord>> {
        let Some((_, path)) = Self::chunk_files(&self.cache_dir(name))?
            .into_iter()
            .find(|(chunk, _)| chunk.end() == end)
        else {
            return Ok(None);
        };
        read_record(&path).map(Some)
    }

    fn write_cache(&mut self, name: &str, record: &CacheRecord) -> Result<()> {
        let dir = self.cache_dir(name);
        Self::clear_chunks(&dir, record.range)?;
        create_dir(&dir)?;
        write_record(&dir.join(chunk_file_name(record.range)), record)
    }

    fn read_candles(&self, name: &str, range: TimeRange) -> Result<Vec<Candle>> {
        let mut candles = Vec::new();
        // A candle is written by the chunk it closes in, which can be later
        // than the chunk it starts in.
        for (chunk, path) in Self::chunk_files(&self.data_dir(name))? {
            if chunk.end() <= range.start() {
                continue;
            }
            let data: CandleData = read_record(&path)?;
            candles.extend(
                data.candles
                    .into_iter()
                    .filter(|candle| range.contains(candle.timestamp)),
            );
        }
        candles.sort_by_key(|candle| candle.timestamp);
        Ok(candles)
    }

    fn write_candles(&mut self, name: &str, data: &CandleData) -> Result<()> {
        let dir = self.data_dir(name);
        Self::clear_chunks(&dir, data.range)?;
        create_dir(&dir)?;
        write_record(&dir.join(chunk_file_name(data.range)), data)
    }

    fn purge(&mut self, name: &str, range: TimeRange) -> Result<()> {
        Self::clear_chunks(&self.cache_dir(name), range)?;
        Self::clear_chunks(&self.data_dir(name), range)?;
        tracing::info!(dataset = name, %range, "purged candle output");
        Ok(())
    }
}

fn create_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| StoreError::CreateDir {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| StoreError::DeleteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Lists the file names in `dir`. A missing directory holds nothing.
fn list_dir(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|e| StoreError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if let Some(name) = entry.file_name().to_str() {
            files.push((name.to_string(), entry.path()));
        }
    }
    Ok(files)
}

/// Reads a record. A file named like a record that does not parse is an
/// error, since the catalog already counts it.
fn read_record<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "corrupt record");
        StoreError::ParseJson {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Writes a record through a temporary file so readers never see half of it.
fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let json = serde_json::to_string(record)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|e| StoreError::WriteFile {
        path: tmp.clone(),
        source: e,
    })?;
    fs::rename(&tmp, path).map_err(|e| StoreError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Fallback for determining home directory.
fn dirs_fallback() -> PathBuf {
    BaseDirs::new()
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.home_dir().to_path_buf())
        .join(".ticksmith")
}
