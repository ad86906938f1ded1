// =============================================================================
// Volume Breakout Signal
// =============================================================================
//
// Evaluated per bar against the previous bar, in priority order:
//
//   StrongBuy  — close > resistance AND volume > prev volume
//   StrongSell — close < support    AND volume > prev volume
//   Buy        — close > prev close AND volume > prev volume
//   Sell       — close < prev close AND volume > prev volume
//   Neutral    — otherwise (and always on bar 0)
//
// A weak rule only applies when neither strong rule fired on that bar.

use crate::market_data::CandleSeries;
use crate::types::Signal;

pub fn calculate_volume_signal(series: &CandleSeries, support: f64, resistance: f64) -> Vec<Signal> {
    let candles = series.candles();
    let mut out = Vec::with_capacity(candles.len());
    if candles.is_empty() {
        return out;
    }

    out.push(Signal::Neutral);
    for pair in candles.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let rising_volume = cur.volume > prev.volume;

        let signal = if !rising_volume {
            Signal::Neutral
        } else if cur.close > resistance {
            Signal::StrongBuy
        } else if cur.close < support {
            Signal::StrongSell
        } else if cur.close > prev.close {
            Signal::Buy
        } else if cur.close < prev.close {
            Signal::Sell
        } else {
            Signal::Neutral
        };
        out.push(signal);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::test_support::series_from_ohlcv;

    fn bar(close: f64, volume: f64) -> (f64, f64, f64, f64, f64) {
        (close, close, close, close, volume)
    }

    #[test]
    fn empty_series_has_no_signals() {
        let series = series_from_ohlcv(&[]);
        assert!(calculate_volume_signal(&series, 90.0, 110.0).is_empty());
    }

    #[test]
    fn first_bar_is_neutral() {
        let series = series_from_ohlcv(&[bar(200.0, 1000.0)]);
        assert_eq!(calculate_volume_signal(&series, 90.0, 110.0), vec![Signal::Neutral]);
    }

    #[test]
    fn strong_buy_wins_over_weak_buy() {
        // Bar 1 closes above resistance, above the previous close, on rising
        // volume: both the strong and the weak rule hold.
        let series = series_from_ohlcv(&[bar(105.0, 100.0), bar(115.0, 200.0)]);
        let signals = calculate_volume_signal(&series, 90.0, 110.0);
        assert_eq!(signals[1], Signal::StrongBuy);
    }

    #[test]
    fn strong_sell_wins_over_weak_sell() {
        let series = series_from_ohlcv(&[bar(95.0, 100.0), bar(85.0, 200.0)]);
        let signals = calculate_volume_signal(&series, 90.0, 110.0);
        assert_eq!(signals[1], Signal::StrongSell);
    }

    #[test]
    fn weak_rules_inside_levels() {
        let series = series_from_ohlcv(&[
            bar(100.0, 100.0),
            bar(101.0, 150.0),
            bar(99.0, 200.0),
            bar(99.0, 300.0),
        ]);
        let signals = calculate_volume_signal(&series, 90.0, 110.0);
        assert_eq!(
            signals,
            vec![Signal::Neutral, Signal::Buy, Signal::Sell, Signal::Neutral]
        );
    }

    #[test]
    fn falling_volume_is_always_neutral() {
        let series = series_from_ohlcv(&[bar(100.0, 300.0), bar(120.0, 200.0), bar(80.0, 100.0)]);
        let signals = calculate_volume_signal(&series, 90.0, 110.0);
        assert!(signals.iter().all(|s| s.is_neutral()));
    }
}
