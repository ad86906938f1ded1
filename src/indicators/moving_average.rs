// =============================================================================
// Moving Averages, Volatility and EMA Crossover
// =============================================================================
//
//   SMA        = rolling mean of close over `long_period`
//   EMA        = exponential mean of close, span `short_period`
//   EMA long   = exponential mean of close, span `long_period`
//   Volatility = rolling std of close-to-close returns over `short_period`,
//                scaled by sqrt(short_period)
//
// Crossover signal (EMA short vs EMA long):
//   Buy  when short crosses above long (prev short <= long, now short > long)
//   Sell when short crosses below long
//   Neutral otherwise
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::indicators::rolling::{self, Series};
use crate::indicators::{crossing, Crossing};
use crate::market_data::CandleSeries;
use crate::types::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingAverageParams {
    pub short_period: usize,
    pub long_period: usize,
}

impl Default for MovingAverageParams {
    fn default() -> Self {
        Self {
            short_period: 9,
            long_period: 21,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverages {
    pub sma: Series,
    pub ema: Series,
    pub ema_long: Series,
    pub volatility: Series,
    pub signal: Vec<Signal>,
}

/// Compute the moving-average family for `series`.
///
/// Fails with `InsufficientData` when the series is shorter than
/// `long_period`.
pub fn calculate_moving_averages(
    series: &CandleSeries,
    params: &MovingAverageParams,
) -> EngineResult<MovingAverages> {
    if params.short_period == 0 || params.long_period == 0 {
        return Err(EngineError::invalid("moving-average periods must be positive"));
    }
    if series.len() < params.long_period {
        return Err(EngineError::InsufficientData {
            indicator: "moving averages",
            required: params.long_period,
            actual: series.len(),
        });
    }

    let closes = rolling::defined(&series.closes());

    let sma = rolling::rolling_mean(&closes, params.long_period);
    let ema = rolling::ewm(&closes, params.short_period);
    let ema_long = rolling::ewm(&closes, params.long_period);

    let scale = (params.short_period as f64).sqrt();
    let volatility = rolling::rolling_std(&rolling::pct_change(&closes), params.short_period)
        .into_iter()
        .map(|v| v.map(|s| s * scale))
        .collect();

    let signal = (0..closes.len())
        .map(|i| match crossing(&ema, &ema_long, i) {
            Some(Crossing::Above) => Signal::Buy,
            Some(Crossing::Below) => Signal::Sell,
            None => Signal::Neutral,
        })
        .collect();

    Ok(MovingAverages {
        sma,
        ema,
        ema_long,
        volatility,
        signal,
    })
}
