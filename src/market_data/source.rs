// =============================================================================
// Market data source boundary
// =============================================================================

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::error::EngineError;
use crate::market_data::{Candle, FetchPeriod};

/// Errors from a candle provider. Network failures are kept distinct from an
/// empty answer so the live loop can retry the former and skip the latter.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no candles returned for {ticker}")]
    Empty { ticker: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("unsupported candle interval: {0} minutes")]
    UnsupportedInterval(u32),

    #[error("fetch period {0} reaches before the supported calendar")]
    PeriodOutOfRange(FetchPeriod),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<SourceError> for EngineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Network(_) | SourceError::Empty { .. } => EngineError::unavailable(err.to_string()),
            SourceError::Malformed(_) | SourceError::UnsupportedInterval(_) | SourceError::PeriodOutOfRange(_) => {
                EngineError::invalid(err.to_string())
            }
        }
    }
}

/// Provider of ordered candles for an instrument.
#[allow(async_fn_in_trait)]
pub trait CandleSource {
    /// Candles of `interval_minutes` for `ticker`, starting on the date of
    /// `now - period`, oldest first.
    async fn fetch_candles(
        &self,
        ticker: &str,
        interval_minutes: u32,
        period: FetchPeriod,
        now: NaiveDateTime,
    ) -> Result<Vec<Candle>, SourceError>;
}
