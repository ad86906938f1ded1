use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle. `timestamp` is the bucket start in exchange-local
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(alias = "begin", with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Build a candle, enforcing `low <= min(open, close) <= max(open, close)
    /// <= high` and a non-negative volume.
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> EngineResult<Self> {
        let candle = Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        candle.validate()?;
        Ok(candle)
    }

    /// Check the OHLCV invariant. Used for candles that arrive through serde.
    pub fn validate(&self) -> EngineResult<()> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::invalid(format!(
                "candle at {} has a non-finite field",
                self.timestamp
            )));
        }
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if self.low > body_low || body_high > self.high {
            return Err(EngineError::invalid(format!(
                "candle at {} violates low <= open/close <= high (o={} h={} l={} c={})",
                self.timestamp, self.open, self.high, self.low, self.close
            )));
        }
        if self.volume < 0.0 {
            return Err(EngineError::invalid(format!(
                "candle at {} has negative volume {}",
                self.timestamp, self.volume
            )));
        }
        Ok(())
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// What [`CandleSeries::upsert`] did with an incoming candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// Newer than the tail: appended.
    Appended,
    /// Same timestamp as the tail: the in-progress bar was refreshed.
    Replaced,
    /// Older than the tail: history is never rewritten, so it was dropped.
    Stale,
}

// ---------------------------------------------------------------------------
// CandleSeries
// ---------------------------------------------------------------------------

/// Ordered candles with strictly increasing timestamps.
///
/// The series only grows: new bars are appended and the most recent bar may be
/// replaced wholesale by a fresher reading of the same bucket. Indicators never
/// mutate it; they read column snapshots through the accessors below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> EngineResult<Self> {
        for (i, pair) in candles.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(EngineError::invalid(format!(
                    "timestamps must be strictly increasing: index {} ({}) is not after {}",
                    i + 1,
                    pair[1].timestamp,
                    pair[0].timestamp
                )));
            }
        }
        Ok(Self { candles })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Append a candle strictly newer than the current tail.
    pub fn push(&mut self, candle: Candle) -> EngineResult<()> {
        if let Some(last) = self.candles.last() {
            if candle.timestamp <= last.timestamp {
                return Err(EngineError::invalid(format!(
                    "cannot append candle at {}: tail is at {}",
                    candle.timestamp, last.timestamp
                )));
            }
        }
        self.candles.push(candle);
        Ok(())
    }

    /// Replace the in-progress tail candle with a fresher reading of the same
    /// bucket. The timestamps must match exactly.
    pub fn replace_tail(&mut self, candle: Candle) -> EngineResult<()> {
        match self.candles.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => {
                *last = candle;
                Ok(())
            }
            Some(last) => Err(EngineError::invalid(format!(
                "cannot replace tail at {} with candle at {}",
                last.timestamp, candle.timestamp
            ))),
            None => Err(EngineError::invalid("cannot replace tail of an empty series")),
        }
    }

    /// Route an incoming candle to [`push`](Self::push) or
    /// [`replace_tail`](Self::replace_tail) depending on its timestamp.
    pub fn upsert(&mut self, candle: Candle) -> EngineResult<Upsert> {
        match self.candles.last() {
            Some(last) if candle.timestamp == last.timestamp => {
                self.replace_tail(candle)?;
                Ok(Upsert::Replaced)
            }
            Some(last) if candle.timestamp < last.timestamp => Ok(Upsert::Stale),
            _ => {
                self.push(candle)?;
                Ok(Upsert::Appended)
            }
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Candles whose date component equals `date` (one trading-day partition).
    pub fn session(&self, date: NaiveDate) -> &[Candle] {
        let start = self.candles.partition_point(|c| c.date() < date);
        let end = self.candles.partition_point(|c| c.date() <= date);
        &self.candles[start..end]
    }

    pub fn last_session_date(&self) -> Option<NaiveDate> {
        self.candles.last().map(Candle::date)
    }
}

// ---------------------------------------------------------------------------
// Timestamp wire format
// ---------------------------------------------------------------------------

/// Exchange timestamps as `YYYY-MM-DD HH:MM:SS`; the ISO `T` separator is
/// accepted on read.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn parse(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(s, ISO_FORMAT))
    }

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
