// =============================================================================
// Relative Strength Index (RSI) — rolling-mean smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — delta = close[i] - close[i-1] (undefined at bar 0).
// Step 2 — gain = max(delta, 0), loss = max(-delta, 0).
// Step 3 — avg_gain / avg_loss = rolling mean over `period`, emitting as soon
//          as one delta is inside the window.
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

use crate::error::{EngineError, EngineResult};
use crate::indicators::rolling::{self, Series};
use crate::market_data::CandleSeries;
use crate::types::Condition;

pub const DEFAULT_PERIOD: usize = 18;

/// Compute the aligned RSI series for `series`.
///
/// Fails with `InsufficientData` when the series is shorter than `period`.
pub fn calculate_rsi(series: &CandleSeries, period: usize) -> EngineResult<Series> {
    if period == 0 {
        return Err(EngineError::invalid("rsi period must be positive"));
    }
    if series.len() < period {
        return Err(EngineError::InsufficientData {
            indicator: "rsi",
            required: period,
            actual: series.len(),
        });
    }
    Ok(rsi_series(&rolling::defined(&series.closes()), period))
}

/// RSI over an arbitrary aligned series. Shared with Stochastic RSI.
pub fn rsi_series(closes: &[Option<f64>], period: usize) -> Series {
    let delta = rolling::diff(closes);
    let gain: Series = delta.iter().map(|d| d.map(|d| d.max(0.0))).collect();
    let loss: Series = delta.iter().map(|d| d.map(|d| (-d).max(0.0))).collect();

    let avg_gain = rolling::rolling_mean_min_periods(&gain, period, 1);
    let avg_loss = rolling::rolling_mean_min_periods(&loss, period, 1);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| rsi_from_averages((*g)?, (*l)?))
        .collect()
}

/// Label an RSI reading.
pub fn rsi_condition(value: f64) -> Condition {
    if value >= 70.0 {
        Condition::Overbought
    } else if value <= 30.0 {
        Condition::Oversold
    } else {
        Condition::Neutral
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If average loss is zero (only gains), RSI saturates at 100.0.
/// - If both averages are zero the window has no movement at all. That case
///   is read as neutral and yields 50.0 instead of an undefined value, so a
///   flat stretch never reports overbought.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi.clamp(0.0, 100.0))
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::test_support::{pseudo_random_closes, series_from_closes};

    #[test]
    fn rsi_period_zero() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        assert!(matches!(calculate_rsi(&series, 0), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn rsi_insufficient_data() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            calculate_rsi(&series, 14),
            Err(EngineError::InsufficientData { required: 14, actual: 3, .. })
        ));
    }

    #[test]
    fn rsi_first_bar_is_undefined() {
        let series = series_from_closes(&(1..=20).map(|x| x as f64).collect::<Vec<_>>());
        let rsi = calculate_rsi(&series, 14).unwrap();
        assert_eq!(rsi.len(), 20);
        assert!(rsi[0].is_none());
        assert!(rsi[1..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_all_gains_saturates() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let rsi = calculate_rsi(&series_from_closes(&closes), 14).unwrap();
        for v in rsi.iter().flatten() {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let rsi = calculate_rsi(&series_from_closes(&closes), 14).unwrap();
        for v in rsi.iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_is_neutral() {
        let rsi = calculate_rsi(&series_from_closes(&[100.0; 30]), 14).unwrap();
        for v in rsi.iter().flatten() {
            assert!((v - 50.0).abs() < 1e-10, "expected 50.0, got {v}");
        }
    }

    #[test]
    fn rsi_known_value() {
        // Deltas +2, -1, +3 with period 3: avg gain 5/3, avg loss 1/3 => RS 5.
        let rsi = calculate_rsi(&series_from_closes(&[10.0, 12.0, 11.0, 14.0]), 3).unwrap();
        let expected = 100.0 - 100.0 / 6.0;
        assert!((rsi[3].unwrap() - expected).abs() < 1e-10);
        // Bar 1 only sees one gain: saturated.
        assert!((rsi[1].unwrap() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check_for_many_windows() {
        let closes = pseudo_random_closes(250, 7);
        let series = series_from_closes(&closes);
        for period in [1, 2, 5, 14, 18, 50] {
            let rsi = calculate_rsi(&series, period).unwrap();
            for v in rsi.iter().flatten() {
                assert!((0.0..=100.0).contains(v), "period {period}: RSI {v} out of range");
            }
        }
    }

    #[test]
    fn condition_labels() {
        assert_eq!(rsi_condition(85.0), Condition::Overbought);
        assert_eq!(rsi_condition(15.0), Condition::Oversold);
        assert_eq!(rsi_condition(50.0), Condition::Neutral);
    }
}
