// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), σ being the sample standard deviation of
// closes over the same window.
//
// Per-bar signal: Buy when close < lower, Sell when close > upper, else 0.
// Position carries the last non-zero signal forward (0 before the first one).
// Strategy returns = close-to-close return * position of the previous bar,
// compounded into a cumulative return curve. The curve is retrospective only.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::indicators::rolling::{self, Series};
use crate::market_data::CandleSeries;
use crate::types::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerParams {
    pub window: usize,
    pub num_std: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            window: 20,
            num_std: 2.0,
        }
    }
}

/// Aligned band, signal and performance sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub middle: Series,
    pub std_dev: Series,
    pub upper: Series,
    pub lower: Series,
    /// Buy / Neutral / Sell per bar.
    pub signal: Vec<Signal>,
    /// Held position: the most recent non-neutral signal.
    pub position: Vec<Signal>,
    pub returns: Series,
    pub strategy_returns: Series,
    pub cumulative_returns: Series,
}

/// Recommendation for the most recent bar only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerRecommendation {
    pub signal: Signal,
    pub reason: String,
}

pub fn calculate_bollinger(series: &CandleSeries, params: &BollingerParams) -> EngineResult<BollingerBands> {
    if params.window == 0 {
        return Err(EngineError::invalid("bollinger window must be positive"));
    }
    if !params.num_std.is_finite() || params.num_std < 0.0 {
        return Err(EngineError::invalid("bollinger band width must be a non-negative number"));
    }

    let raw_closes = series.closes();
    let closes = rolling::defined(&raw_closes);

    let middle = rolling::rolling_mean(&closes, params.window);
    let std_dev = rolling::rolling_std(&closes, params.window);
    let band = |sign: f64| -> Series {
        middle
            .iter()
            .copied()
            .zip(std_dev.iter().copied())
            .map(|(m, s)| Some(m? + sign * params.num_std * s?))
            .collect()
    };
    let upper = band(1.0);
    let lower = band(-1.0);

    let signal: Vec<Signal> = raw_closes
        .iter()
        .enumerate()
        .map(|(i, &close)| band_signal(close, upper[i], lower[i]))
        .collect();

    let mut position = Vec::with_capacity(signal.len());
    let mut held = Signal::Neutral;
    for &s in &signal {
        if !s.is_neutral() {
            held = s;
        }
        position.push(held);
    }

    let returns = rolling::pct_change(&closes);
    let strategy_returns: Series = (0..returns.len())
        .map(|i| {
            let prev_position = position.get(i.checked_sub(1)?)?;
            Some(returns[i]? * f64::from(prev_position.value()))
        })
        .collect();

    let mut growth = 1.0;
    let cumulative_returns = strategy_returns
        .iter()
        .map(|r| {
            r.map(|r| {
                growth *= 1.0 + r;
                growth
            })
        })
        .collect();

    Ok(BollingerBands {
        middle,
        std_dev,
        upper,
        lower,
        signal,
        position,
        returns,
        strategy_returns,
        cumulative_returns,
    })
}

fn band_signal(close: f64, upper: Option<f64>, lower: Option<f64>) -> Signal {
    match (upper, lower) {
        (_, Some(lower)) if close < lower => Signal::Buy,
        (Some(upper), _) if close > upper => Signal::Sell,
        _ => Signal::Neutral,
    }
}

impl BollingerBands {
    /// Point recommendation from the latest bar.
    pub fn recommendation(&self, series: &CandleSeries) -> BollingerRecommendation {
        let last = self.signal.len().checked_sub(1);
        let close = series.last().map(|c| c.close);
        let (upper, lower) = match last {
            Some(i) => (self.upper[i], self.lower[i]),
            None => (None, None),
        };

        match (close, upper, lower) {
            (Some(c), _, Some(l)) if c < l => BollingerRecommendation {
                signal: Signal::Buy,
                reason: format!("close {c:.2} is below the lower band {l:.2}"),
            },
            (Some(c), Some(u), _) if c > u => BollingerRecommendation {
                signal: Signal::Sell,
                reason: format!("close {c:.2} is above the upper band {u:.2}"),
            },
            (Some(_), Some(_), Some(_)) => BollingerRecommendation {
                signal: Signal::Neutral,
                reason: "close is inside the bands: hold".to_string(),
            },
            _ => BollingerRecommendation {
                signal: Signal::Neutral,
                reason: "bands are not defined yet: hold".to_string(),
            },
        }
    }
}
