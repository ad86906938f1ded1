// =============================================================================
// Live Update Loop — scheduled fetch, merge, recompute, publish
// =============================================================================
//
// One cycle per schedule tick, awaited to completion before the next tick is
// computed, so cycles never overlap and the series has a single writer:
//
//   1. fetch the recent candles (bounded retry with exponential backoff,
//      network failures only)
//   2. merge into the series: newer bars appended, the in-progress tail
//      replaced, stale bars ignored
//   3. rebuild the snapshot from scratch and hand it to the sink
//
// A failed tick is logged and skipped. The loop ends when the schedule has no
// fire time left before market close.
// =============================================================================

use anyhow::Result;
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, error, info, instrument, warn};

use crate::analysis::{pivot_session, Snapshot};
use crate::market_data::storage::Storage;
use crate::market_data::{Candle, CandleSeries, CandleSource, SourceError, Upsert};
use crate::runtime_config::RuntimeConfig;

// =============================================================================
// TradingSchedule
// =============================================================================

/// Fires at second 0 of every minute whose minute-of-day is a multiple of
/// `interval_minutes`, inside `[open, close)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingSchedule {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub interval_minutes: u32,
}

impl TradingSchedule {
    pub fn new(open: NaiveTime, close: NaiveTime, interval_minutes: u32) -> Self {
        Self {
            open,
            close,
            interval_minutes: interval_minutes.max(1),
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.market_open, config.market_close, config.interval_minutes)
    }

    /// First fire time strictly after `now` on the same day, or `None` once
    /// the session is over.
    pub fn next_fire(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let interval = self.interval_minutes;
        let earliest = (minute_of_day(now.time()) + 1).max(minute_of_day_ceil(self.open));
        let minute = earliest.div_ceil(interval) * interval;

        let at = now.date().and_hms_opt(minute / 60, minute % 60, 0)?;
        (at.time() < self.close).then_some(at)
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Minute-of-day rounded up, so an open of 10:00:30 first fires at 10:01.
fn minute_of_day_ceil(time: NaiveTime) -> u32 {
    let m = minute_of_day(time);
    if time.second() > 0 || time.nanosecond() > 0 {
        m + 1
    } else {
        m
    }
}

// =============================================================================
// SnapshotSink
// =============================================================================

/// Receiver of every recomputed snapshot.
pub trait SnapshotSink {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Writes each snapshot over one `_processed` file.
pub struct StorageSink {
    storage: Storage,
    filename: String,
}

impl StorageSink {
    pub fn new(storage: Storage, filename: impl Into<String>) -> Self {
        Self {
            storage,
            filename: filename.into(),
        }
    }
}

impl SnapshotSink for StorageSink {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.storage.write_json(&self.filename, snapshot)?;
        Ok(())
    }
}

// =============================================================================
// LiveUpdater
// =============================================================================

/// What one merge did to the series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub appended: usize,
    pub replaced: usize,
    pub stale: usize,
}

pub struct LiveUpdater<S, K> {
    config: RuntimeConfig,
    schedule: TradingSchedule,
    source: S,
    sink: K,
    series: CandleSeries,
}

impl<S: CandleSource, K: SnapshotSink> LiveUpdater<S, K> {
    pub fn new(config: RuntimeConfig, source: S, sink: K, series: CandleSeries) -> Self {
        Self {
            schedule: TradingSchedule::from_config(&config),
            config,
            source,
            sink,
            series,
        }
    }

    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Run ticks until market close.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            ticker = %self.config.ticker,
            interval_minutes = self.schedule.interval_minutes,
            open = %self.schedule.open,
            close = %self.schedule.close,
            "live loop starting"
        );

        loop {
            let now = self.config.exchange_now();
            let Some(next) = self.schedule.next_fire(now) else {
                info!(ticker = %self.config.ticker, "market closed, live loop finished");
                return Ok(());
            };

            let wait = (next - now).to_std().unwrap_or_default();
            debug!(next = %next, wait_secs = wait.as_secs(), "sleeping until next tick");
            tokio::time::sleep(wait).await;

            match self.tick(next).await {
                Ok(Some(snapshot)) => println!("{}\n", snapshot.summary),
                Ok(None) => {}
                Err(e) => error!(at = %next, error = %format!("{e:#}"), "tick failed, continuing"),
            }
        }
    }

    /// One fetch/merge/recompute/publish cycle. A failed fetch skips the tick
    /// and returns `Ok(None)`.
    #[instrument(skip(self), fields(ticker = %self.config.ticker))]
    pub async fn tick(&mut self, at: NaiveDateTime) -> Result<Option<Snapshot>> {
        let candles = match self.fetch_with_retry(at).await {
            Ok(candles) => candles,
            Err(e) => {
                warn!(error = %e, "fetch failed, skipping tick");
                return Ok(None);
            }
        };

        let stats = self.merge(candles)?;
        info!(
            appended = stats.appended,
            replaced = stats.replaced,
            stale = stats.stale,
            bars = self.series.len(),
            "series updated"
        );

        let session = pivot_session(&self.series, self.config.levels_from_last_session, at.date());
        let snapshot = Snapshot::build(&self.config, &self.series, session, at)?;
        self.sink.publish(&snapshot)?;
        Ok(Some(snapshot))
    }

    /// Merge fetched candles (in any order) into the series.
    pub fn merge(&mut self, mut candles: Vec<Candle>) -> Result<MergeStats> {
        candles.sort_by_key(|c| c.timestamp);

        let mut stats = MergeStats::default();
        for candle in candles {
            match self.series.upsert(candle)? {
                Upsert::Appended => stats.appended += 1,
                Upsert::Replaced => stats.replaced += 1,
                Upsert::Stale => stats.stale += 1,
            }
        }
        Ok(stats)
    }

    async fn fetch_with_retry(&self, at: NaiveDateTime) -> Result<Vec<Candle>, SourceError> {
        let max_attempts = self.config.source.max_attempts.max(1);
        let mut backoff = std::time::Duration::from_millis(self.config.source.retry_backoff_ms);

        let mut attempt = 1;
        loop {
            let result = self
                .source
                .fetch_candles(&self.config.ticker, self.config.interval_minutes, self.config.period, at)
                .await;

            match result {
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
