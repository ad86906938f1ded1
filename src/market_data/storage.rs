// =============================================================================
// Candle & snapshot storage — JSON files with atomic save
// =============================================================================
//
// Candle files are JSON arrays of {timestamp, open, high, low, close, volume}
// records named `{ticker}_{start-date}_{period}_[{HHMMSS}].json`. Processed
// snapshots land next to their source as `{name}_processed.json`.
//
// Writes go to a `.tmp` sibling first and are renamed into place so a crash
// never leaves a truncated file behind.
// =============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::market_data::{Candle, CandleSeries, FetchPeriod};

/// File storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    /// Open `dir`, creating it when it does not exist yet.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create storage directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Load and validate a candle file.
    pub fn load_series(&self, filename: &str) -> EngineResult<CandleSeries> {
        let path = self.path_of(filename);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => EngineError::unavailable(format!("candle file {} not found", path.display())),
            _ => EngineError::unavailable(format!("failed to read {}: {e}", path.display())),
        })?;

        let candles: Vec<Candle> = serde_json::from_str(&content)
            .map_err(|e| EngineError::invalid(format!("failed to parse {}: {e}", path.display())))?;
        if candles.is_empty() {
            return Err(EngineError::unavailable(format!("candle file {} is empty", path.display())));
        }
        for candle in &candles {
            candle.validate()?;
        }

        let series = CandleSeries::new(candles)?;
        info!(path = %path.display(), count = series.len(), "candle series loaded");
        Ok(series)
    }

    /// Persist a freshly fetched series under the conventional file name and
    /// return that name.
    pub fn save_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        period: FetchPeriod,
        fetched_at: NaiveTime,
        series: &CandleSeries,
    ) -> Result<String> {
        let filename = candle_file_name(ticker, start, period, fetched_at);
        self.write_json(&filename, series)?;
        Ok(filename)
    }

    /// Serialise `value` as pretty JSON into `filename` atomically.
    pub fn write_json<T: Serialize + ?Sized>(&self, filename: &str, value: &T) -> Result<PathBuf> {
        let path = self.path_of(filename);
        write_json_atomic(&path, value)?;
        Ok(path)
    }
}

/// Pretty JSON to `path` through a `.json.tmp` sibling and a rename.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialise {}", path.display()))?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &content)
        .with_context(|| format!("failed to write tmp file {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename tmp file to {}", path.display()))?;

    info!(path = %path.display(), "file saved (atomic)");
    Ok(())
}

/// `{ticker}_{start-date}_{period}_[{HHMMSS}].json`
pub fn candle_file_name(ticker: &str, start: NaiveDate, period: FetchPeriod, fetched_at: NaiveTime) -> String {
    format!(
        "{}_{}_{}_[{}].json",
        ticker,
        start.format("%Y-%m-%d"),
        period,
        fetched_at.format("%H%M%S")
    )
}

/// `{stem}_processed.json` for a source file name.
pub fn processed_file_name(source_filename: &str) -> String {
    let stem = source_filename.strip_suffix(".json").unwrap_or(source_filename);
    format!("{stem}_processed.json")
}
