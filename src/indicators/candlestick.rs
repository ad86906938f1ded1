// =============================================================================
// Candlestick Pattern Flags
// =============================================================================
//
// Hammer       — lower shadow > 2 * body, upper shadow < body, and the `window`
//                closes before the bar strictly decreasing (downtrend).
// Hanging Man  — same shape after a strictly increasing window (uptrend).
// Engulfing    — compares the bar with its predecessor:
//                bullish: prev bearish, current bullish, current open < prev
//                close and current close > prev open; bearish is the mirror.
//                Bar 0 never engulfs.

use serde::{Deserialize, Serialize};

use crate::market_data::{Candle, CandleSeries};

pub const DEFAULT_TREND_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Engulfing {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFlags {
    pub hammer: bool,
    pub hanging_man: bool,
    pub engulfing: Option<Engulfing>,
}

impl PatternFlags {
    pub fn is_engulfing(&self) -> bool {
        self.engulfing.is_some()
    }
}

pub fn detect_patterns(series: &CandleSeries, window: usize) -> Vec<PatternFlags> {
    let candles = series.candles();
    (0..candles.len())
        .map(|i| {
            let shape = has_hammer_shape(&candles[i]);
            PatternFlags {
                hammer: shape && is_downtrend(candles, i, window),
                hanging_man: shape && is_uptrend(candles, i, window),
                engulfing: engulfing_at(candles, i),
            }
        })
        .collect()
}

fn has_hammer_shape(c: &Candle) -> bool {
    let body = c.body();
    c.lower_shadow() > 2.0 * body && c.upper_shadow() < body
}

/// The `window` closes strictly before bar `i`, or `None` when there are not
/// enough of them.
fn preceding_closes(candles: &[Candle], i: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || i < window {
        return None;
    }
    Some(candles[i - window..i].iter().map(|c| c.close).collect())
}

fn is_downtrend(candles: &[Candle], i: usize, window: usize) -> bool {
    preceding_closes(candles, i, window).is_some_and(|w| w.windows(2).all(|p| p[1] < p[0]))
}

fn is_uptrend(candles: &[Candle], i: usize, window: usize) -> bool {
    preceding_closes(candles, i, window).is_some_and(|w| w.windows(2).all(|p| p[1] > p[0]))
}

fn engulfing_at(candles: &[Candle], i: usize) -> Option<Engulfing> {
    let prev = candles.get(i.checked_sub(1)?)?;
    let cur = candles.get(i)?;

    if prev.is_bearish() && cur.is_bullish() && cur.open < prev.close && cur.close > prev.open {
        Some(Engulfing::Bullish)
    } else if prev.is_bullish() && cur.is_bearish() && cur.open > prev.close && cur.close < prev.open {
        Some(Engulfing::Bearish)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::test_support::series_from_ohlcv;

    // (open, high, low, close, volume)
    const HAMMER: (f64, f64, f64, f64, f64) = (10.0, 10.6, 7.0, 10.5, 1.0);

    fn trend_then(closes: &[f64], last: (f64, f64, f64, f64, f64)) -> CandleSeries {
        let mut rows: Vec<_> = closes.iter().map(|&c| (c, c, c, c, 1.0)).collect();
        rows.push(last);
        series_from_ohlcv(&rows)
    }

    #[test]
    fn hammer_after_downtrend() {
        let series = trend_then(&[14.0, 13.0, 12.0], HAMMER);
        let flags = detect_patterns(&series, 3);
        assert!(flags[3].hammer);
        assert!(!flags[3].hanging_man);
    }

    #[test]
    fn hanging_man_after_uptrend() {
        let series = trend_then(&[7.0, 8.0, 9.0], HAMMER);
        let flags = detect_patterns(&series, 3);
        assert!(flags[3].hanging_man);
        assert!(!flags[3].hammer);
    }

    #[test]
    fn trend_must_be_strict() {
        let series = trend_then(&[14.0, 13.0, 13.0], HAMMER);
        let flags = detect_patterns(&series, 3);
        assert!(!flags[3].hammer);
    }

    #[test]
    fn not_enough_history_for_trend() {
        let series = trend_then(&[14.0, 13.0], HAMMER);
        let flags = detect_patterns(&series, 3);
        assert!(!flags[2].hammer && !flags[2].hanging_man);
    }

    #[test]
    fn long_upper_shadow_is_not_a_hammer() {
        let series = trend_then(&[14.0, 13.0, 12.0], (10.0, 12.0, 7.0, 10.5, 1.0));
        assert!(!detect_patterns(&series, 3)[3].hammer);
    }

    #[test]
    fn bullish_and_bearish_engulfing() {
        let series = series_from_ohlcv(&[
            (10.0, 10.2, 8.8, 9.0, 1.0),  // bearish
            (8.8, 10.6, 8.7, 10.5, 1.0),  // bullish, engulfs
            (10.6, 11.2, 8.6, 8.7, 1.0),  // bearish, engulfs
        ]);
        let flags = detect_patterns(&series, 3);
        assert_eq!(flags[1].engulfing, Some(Engulfing::Bullish));
        assert_eq!(flags[2].engulfing, Some(Engulfing::Bearish));
        assert!(flags[1].is_engulfing());
    }

    #[test]
    fn partial_overlap_is_not_engulfing() {
        let series = series_from_ohlcv(&[
            (10.0, 10.2, 8.8, 9.0, 1.0),
            (9.2, 10.0, 9.1, 9.8, 1.0),
        ]);
        assert_eq!(detect_patterns(&series, 3)[1].engulfing, None);
    }

    #[test]
    fn first_bar_never_engulfs() {
        for len in 1..5 {
            let rows: Vec<_> = (0..len)
                .map(|i| if i % 2 == 0 { (10.0, 11.0, 8.0, 9.0, 1.0) } else { (8.5, 11.5, 8.0, 11.0, 1.0) })
                .collect();
            let flags = detect_patterns(&series_from_ohlcv(&rows), 3);
            assert_eq!(flags.len(), len);
            assert!(!flags[0].is_engulfing());
        }
    }
}
