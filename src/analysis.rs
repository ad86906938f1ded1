// =============================================================================
// Analysis pipeline — indicator set, processed records, snapshot
// =============================================================================
//
// One recompute pass over an immutable CandleSeries:
//
//   CandleSeries ──► IndicatorSet::compute ──► Summary::build ──► Snapshot
//                                         └──► records() (augmented per-bar rows)
//
// Every stage is a pure function of its inputs; two passes over the same
// series produce identical snapshots.
// =============================================================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::indicators::bollinger::{calculate_bollinger, BollingerBands};
use crate::indicators::candlestick::{detect_patterns, Engulfing, PatternFlags};
use crate::indicators::moving_average::{calculate_moving_averages, MovingAverages};
use crate::indicators::pivot::{calculate_levels, SupportResistanceLevels};
use crate::indicators::rsi::calculate_rsi;
use crate::indicators::stoch_rsi::{calculate_stoch_rsi, StochRsi};
use crate::indicators::stochastic::{calculate_stochastic, Stochastic};
use crate::indicators::volume::calculate_volume_signal;
use crate::indicators::Series;
use crate::market_data::candle_series::timestamp_format;
use crate::market_data::CandleSeries;
use crate::runtime_config::{IndicatorParams, RuntimeConfig};
use crate::signals::summary::Summary;
use crate::types::Signal;

// =============================================================================
// IndicatorSet
// =============================================================================

/// Every indicator of one recompute, aligned with the source series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub moving_averages: MovingAverages,
    pub bollinger: BollingerBands,
    pub rsi: Series,
    pub stochastic: Stochastic,
    pub stoch_rsi: StochRsi,
    /// `None` when the pivot session has no candles.
    pub levels: Option<SupportResistanceLevels>,
    /// Needs `levels`; `None` alongside it.
    pub volume_signal: Option<Vec<Signal>>,
    pub patterns: Vec<PatternFlags>,
}

impl IndicatorSet {
    /// Run every indicator over `series`. Pivot levels come from the candles
    /// dated `session`; an empty session is reported and leaves the levels
    /// and the volume signal undefined instead of failing the pass.
    pub fn compute(series: &CandleSeries, params: &IndicatorParams, session: NaiveDate) -> EngineResult<Self> {
        let moving_averages = calculate_moving_averages(series, &params.moving_average)?;
        let bollinger = calculate_bollinger(series, &params.bollinger)?;
        let rsi = calculate_rsi(series, params.rsi_period)?;
        let stochastic = calculate_stochastic(series, params.stochastic_period);
        let stoch_rsi = calculate_stoch_rsi(series, &params.stoch_rsi)?;
        let patterns = detect_patterns(series, params.pattern_window);

        let levels = match calculate_levels(series, session) {
            Ok(levels) => Some(levels),
            Err(e @ EngineError::EmptyPartition { .. }) => {
                warn!(error = %e, "pivot levels unavailable");
                None
            }
            Err(e) => return Err(e),
        };
        let volume_signal = levels.map(|l| calculate_volume_signal(series, l.support_1, l.resistance_1));

        debug!(bars = series.len(), %session, has_levels = levels.is_some(), "indicator set computed");

        Ok(Self {
            moving_averages,
            bollinger,
            rsi,
            stochastic,
            stoch_rsi,
            levels,
            volume_signal,
            patterns,
        })
    }

    /// Augmented per-bar rows: the candle plus every indicator column.
    pub fn records(&self, series: &CandleSeries) -> Vec<ProcessedRecord> {
        let ma = &self.moving_averages;
        let bb = &self.bollinger;
        series
            .candles()
            .iter()
            .enumerate()
            .map(|(i, c)| ProcessedRecord {
                timestamp: c.timestamp,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
                sma: ma.sma[i],
                ema: ma.ema[i],
                ema_long: ma.ema_long[i],
                volatility: ma.volatility[i],
                ma_signal: ma.signal[i],
                bb_middle: bb.middle[i],
                bb_upper: bb.upper[i],
                bb_lower: bb.lower[i],
                bb_signal: bb.signal[i],
                bb_position: bb.position[i],
                strategy_returns: bb.strategy_returns[i],
                cumulative_returns: bb.cumulative_returns[i],
                rsi: self.rsi[i],
                stochastic_k: self.stochastic.k[i],
                stochastic_signal: self.stochastic.signal[i],
                stoch_rsi_k: self.stoch_rsi.k[i],
                stoch_rsi_d: self.stoch_rsi.d[i],
                stoch_rsi_signal: self.stoch_rsi.signal[i],
                volume_signal: self.volume_signal.as_ref().map(|v| v[i]),
                hammer: self.patterns[i].hammer,
                hanging_man: self.patterns[i].hanging_man,
                engulfing: self.patterns[i].engulfing,
            })
            .collect()
    }
}

/// Pivot session for a pass: today on the exchange clock, or the most recent
/// session in the series when configured so.
pub fn pivot_session(series: &CandleSeries, from_last_session: bool, today: NaiveDate) -> NaiveDate {
    if from_last_session {
        series.last_session_date().unwrap_or(today)
    } else {
        today
    }
}

// =============================================================================
// Processed output
// =============================================================================

/// One bar of the `_processed` file. Undefined indicator values are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub sma: Option<f64>,
    pub ema: Option<f64>,
    pub ema_long: Option<f64>,
    pub volatility: Option<f64>,
    pub ma_signal: Signal,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_signal: Signal,
    pub bb_position: Signal,
    pub strategy_returns: Option<f64>,
    pub cumulative_returns: Option<f64>,
    pub rsi: Option<f64>,
    pub stochastic_k: Option<f64>,
    pub stochastic_signal: Signal,
    pub stoch_rsi_k: Option<f64>,
    pub stoch_rsi_d: Option<f64>,
    pub stoch_rsi_signal: Signal,
    pub volume_signal: Option<Signal>,
    pub hammer: bool,
    pub hanging_man: bool,
    pub engulfing: Option<Engulfing>,
}

/// Published result of one recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ticker: String,
    #[serde(with = "timestamp_format")]
    pub generated_at: NaiveDateTime,
    pub summary: Summary,
    pub records: Vec<ProcessedRecord>,
}

impl Snapshot {
    /// Full recompute: indicators, summary and records.
    pub fn build(
        config: &RuntimeConfig,
        series: &CandleSeries,
        session: NaiveDate,
        generated_at: NaiveDateTime,
    ) -> EngineResult<Self> {
        let set = IndicatorSet::compute(series, &config.indicators, session)?;
        let summary = Summary::build(series, &set, &config.scoring)?;
        Ok(Self {
            ticker: config.ticker.clone(),
            generated_at,
            summary,
            records: set.records(series),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::test_support::{bar_time, pseudo_random_closes, series_from_closes, start_date};

    #[test]
    fn compute_fails_on_short_series() {
        let series = series_from_closes(&[100.0; 10]);
        assert!(matches!(
            IndicatorSet::compute(&series, &IndicatorParams::default(), start_date()),
            Err(EngineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn every_column_is_aligned() {
        let series = series_from_closes(&pseudo_random_closes(50, 1));
        let set = IndicatorSet::compute(&series, &IndicatorParams::default(), start_date()).unwrap();
        assert_eq!(set.rsi.len(), 50);
        assert_eq!(set.stochastic.k.len(), 50);
        assert_eq!(set.stoch_rsi.d.len(), 50);
        assert_eq!(set.patterns.len(), 50);
        assert_eq!(set.volume_signal.as_ref().map(Vec::len), Some(50));

        let records = set.records(&series);
        assert_eq!(records.len(), 50);
        assert_eq!(records[49].timestamp, bar_time(49));
        assert!(records[0].sma.is_none());
        assert!(records[0].engulfing.is_none());
    }

    #[test]
    fn empty_session_leaves_levels_undefined() {
        let series = series_from_closes(&pseudo_random_closes(40, 2));
        let other_day = start_date().succ_opt().unwrap();
        let set = IndicatorSet::compute(&series, &IndicatorParams::default(), other_day).unwrap();
        assert!(set.levels.is_none());
        assert!(set.volume_signal.is_none());
        assert!(set.records(&series).iter().all(|r| r.volume_signal.is_none()));
    }

    #[test]
    fn pivot_session_choice() {
        let series = series_from_closes(&[1.0, 2.0]);
        let today = start_date().succ_opt().unwrap();
        assert_eq!(pivot_session(&series, false, today), today);
        assert_eq!(pivot_session(&series, true, today), start_date());
        assert_eq!(pivot_session(&CandleSeries::default(), true, today), today);
    }

    #[test]
    fn recompute_is_deterministic() {
        let series = series_from_closes(&pseudo_random_closes(120, 9));
        let config = RuntimeConfig::default();
        let at = bar_time(120);

        let first = Snapshot::build(&config, &series, start_date(), at).unwrap();
        let second = Snapshot::build(&config, &series, start_date(), at).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn snapshot_serialises_undefined_as_null() {
        let series = series_from_closes(&pseudo_random_closes(30, 4));
        let snapshot = Snapshot::build(&RuntimeConfig::default(), &series, start_date(), bar_time(30)).unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["records"][0]["sma"].is_null());
        assert_eq!(json["records"][0]["timestamp"], "2024-11-12 07:00:00");
        assert_eq!(json["ticker"], "FEES");
    }
}
