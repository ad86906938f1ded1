// =============================================================================
// Stochastic RSI
// =============================================================================
//
// The stochastic transform applied to RSI instead of price:
//   raw %K = (RSI - min(RSI, period)) / (max(RSI, period) - min(RSI, period)) * 100
//   %K     = rolling mean of raw %K over `smooth_k`
//   %D     = rolling mean of %K over `smooth_d`
// The min/max window includes the current bar; a flat RSI window reads as 50.
//
// Signal (both conditions on the same bar):
//   Buy  — %K crosses above %D while %K < 20
//   Sell — %K crosses below %D while %K > 80
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::indicators::rolling::{self, Series};
use crate::indicators::rsi::rsi_series;
use crate::indicators::stochastic::{percent_k, OVERBOUGHT, OVERSOLD};
use crate::indicators::{crossing, Crossing};
use crate::market_data::CandleSeries;
use crate::types::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochRsiParams {
    pub period: usize,
    pub smooth_k: usize,
    pub smooth_d: usize,
}

impl Default for StochRsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            smooth_k: 3,
            smooth_d: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StochRsi {
    /// RSI computed with `period`; the input of the stochastic transform.
    pub rsi: Series,
    pub k: Series,
    pub d: Series,
    pub signal: Vec<Signal>,
}

pub fn calculate_stoch_rsi(series: &CandleSeries, params: &StochRsiParams) -> EngineResult<StochRsi> {
    if params.period == 0 || params.smooth_k == 0 || params.smooth_d == 0 {
        return Err(EngineError::invalid("stochastic rsi windows must be positive"));
    }
    if series.len() < params.period {
        return Err(EngineError::InsufficientData {
            indicator: "stochastic rsi",
            required: params.period,
            actual: series.len(),
        });
    }

    let rsi = rsi_series(&rolling::defined(&series.closes()), params.period);
    let lowest = rolling::rolling_min(&rsi, params.period);
    let highest = rolling::rolling_max(&rsi, params.period);

    let raw_k: Series = (0..rsi.len())
        .map(|i| Some(percent_k(rsi[i]?, lowest[i]?, highest[i]?)))
        .collect();
    let k = rolling::rolling_mean(&raw_k, params.smooth_k);
    let d = rolling::rolling_mean(&k, params.smooth_d);

    let signal = (0..k.len())
        .map(|i| match (crossing(&k, &d, i), k[i]) {
            (Some(Crossing::Above), Some(kv)) if kv < OVERSOLD => Signal::Buy,
            (Some(Crossing::Below), Some(kv)) if kv > OVERBOUGHT => Signal::Sell,
            _ => Signal::Neutral,
        })
        .collect();

    Ok(StochRsi { rsi, k, d, signal })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::test_support::{pseudo_random_closes, series_from_closes};

    #[test]
    fn insufficient_data() {
        let series = series_from_closes(&[1.0; 5]);
        assert!(matches!(
            calculate_stoch_rsi(&series, &StochRsiParams::default()),
            Err(EngineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn warmup_accumulates_across_stages() {
        let closes = pseudo_random_closes(80, 3);
        let sr = calculate_stoch_rsi(&series_from_closes(&closes), &StochRsiParams::default()).unwrap();
        // RSI from bar 1, min/max window of 14 from bar 14, %K smoothing of 3
        // from bar 16, %D smoothing of 3 from bar 18.
        assert!(sr.rsi[0].is_none() && sr.rsi[1].is_some());
        assert!(sr.k[15].is_none() && sr.k[16].is_some());
        assert!(sr.d[17].is_none() && sr.d[18].is_some());
        assert!(sr.signal[..19].iter().all(|s| s.is_neutral()));
    }

    #[test]
    fn values_stay_in_range() {
        let closes = pseudo_random_closes(300, 11);
        let sr = calculate_stoch_rsi(&series_from_closes(&closes), &StochRsiParams::default()).unwrap();
        for v in sr.k.iter().chain(sr.d.iter()).flatten() {
            assert!((-1e-9..=100.0 + 1e-9).contains(v), "value {v} out of range");
        }
    }

    #[test]
    fn signals_require_cross_and_extreme_zone() {
        let closes = pseudo_random_closes(400, 5);
        let sr = calculate_stoch_rsi(&series_from_closes(&closes), &StochRsiParams::default()).unwrap();
        for i in 0..closes.len() {
            match sr.signal[i] {
                Signal::Buy => {
                    assert_eq!(crossing(&sr.k, &sr.d, i), Some(Crossing::Above));
                    assert!(sr.k[i].unwrap() < OVERSOLD);
                }
                Signal::Sell => {
                    assert_eq!(crossing(&sr.k, &sr.d, i), Some(Crossing::Below));
                    assert!(sr.k[i].unwrap() > OVERBOUGHT);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn plain_crossover_in_middle_zone_is_neutral() {
        // Saw-tooth prices keep %K oscillating through the middle of the range.
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + ((i % 6) as f64 - 2.5).abs())
            .collect();
        let sr = calculate_stoch_rsi(&series_from_closes(&closes), &StochRsiParams::default()).unwrap();
        for i in 0..closes.len() {
            if let (Some(_), Some(kv)) = (crossing(&sr.k, &sr.d, i), sr.k[i]) {
                if (OVERSOLD..=OVERBOUGHT).contains(&kv) {
                    assert_eq!(sr.signal[i], Signal::Neutral, "bar {i}");
                }
            }
        }
    }

    #[test]
    fn flat_prices_read_fifty() {
        let sr = calculate_stoch_rsi(&series_from_closes(&[10.0; 40]), &StochRsiParams::default()).unwrap();
        for v in sr.k.iter().flatten() {
            assert!((v - 50.0).abs() < 1e-10);
        }
        assert!(sr.signal.iter().all(|s| s.is_neutral()));
    }
}
