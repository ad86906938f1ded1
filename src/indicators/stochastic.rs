// =============================================================================
// Stochastic Oscillator (%K, raw)
// =============================================================================
//
// For every bar i >= period, over the `period` bars *before* i:
//   %K = (close_i - lowest_low) / (highest_high - lowest_low) * 100
// A flat lookback (highest_high == lowest_low) reads as 50.
//
// Signal: %K > 80 => overbought (Sell), %K < 20 => oversold (Buy).

use crate::indicators::rolling::Series;
use crate::market_data::CandleSeries;
use crate::types::Signal;

pub const DEFAULT_PERIOD: usize = 14;
pub const OVERBOUGHT: f64 = 80.0;
pub const OVERSOLD: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Stochastic {
    pub k: Series,
    pub signal: Vec<Signal>,
}

pub fn calculate_stochastic(series: &CandleSeries, period: usize) -> Stochastic {
    let candles = series.candles();
    let mut k = vec![None; candles.len()];

    if period > 0 {
        for i in period..candles.len() {
            let lookback = &candles[i - period..i];
            let highest = lookback.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let lowest = lookback.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            k[i] = Some(percent_k(candles[i].close, lowest, highest));
        }
    }

    let signal = k.iter().map(|v| zone_signal(*v)).collect();
    Stochastic { k, signal }
}

/// Position of `value` inside `[lowest, highest]` scaled to 0..100; 50 when the
/// range is empty.
pub fn percent_k(value: f64, lowest: f64, highest: f64) -> f64 {
    let range = highest - lowest;
    if range == 0.0 {
        50.0
    } else {
        (value - lowest) / range * 100.0
    }
}

fn zone_signal(k: Option<f64>) -> Signal {
    match k {
        Some(v) if v > OVERBOUGHT => Signal::Sell,
        Some(v) if v < OVERSOLD => Signal::Buy,
        _ => Signal::Neutral,
    }
}
