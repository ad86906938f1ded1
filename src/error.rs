// =============================================================================
// Engine error taxonomy
// =============================================================================
//
// Every failure the indicator engine can report to a caller. None of these are
// retried inside the engine; the live loop decides whether a failed tick is a
// skip or a stop.

use chrono::NaiveDate;
use thiserror::Error;

/// Result alias used by the engine, storage and aggregation layers.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing required fields in source data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The source file, network or result set is missing or empty.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// The series is shorter than an indicator's required window.
    #[error("insufficient data for {indicator}: need at least {required} candles, got {actual}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        actual: usize,
    },

    /// No candles belong to the requested trading-day partition.
    #[error("no candles in trading session {date}")]
    EmptyPartition { date: NaiveDate },

    /// Too few candles for a reduction that compares bars.
    #[error("series too short: need at least {required} candles, got {actual}")]
    EmptySeries { required: usize, actual: usize },
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }
}
