// =============================================================================
// Summary — cross-indicator reduction of one recompute
// =============================================================================
//
// Reduces an already computed IndicatorSet to labels and latest values:
//
//   trend        — EMA vs SMA on the latest bar
//   volatility   — latest vs series-mean volatility (×1.5 high, ×0.5 low)
//   stoch rsi    — zone of %K, direction of %K vs %D
//   volume       — latest vs previous bar, with percent change
//   composite    — weighted ensemble of the per-indicator signals
//
// Nothing here recomputes an indicator. The summary is rebuilt whole on every
// pass.
// =============================================================================

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::analysis::IndicatorSet;
use crate::error::{EngineError, EngineResult};
use crate::indicators::bollinger::BollingerRecommendation;
use crate::indicators::candlestick::{Engulfing, PatternFlags};
use crate::indicators::pivot::SupportResistanceLevels;
use crate::indicators::rolling;
use crate::indicators::rsi::rsi_condition;
use crate::indicators::stochastic::{OVERBOUGHT, OVERSOLD};
use crate::market_data::candle_series::timestamp_format;
use crate::market_data::CandleSeries;
use crate::runtime_config::ScoringConfig;
use crate::signals::weighted_score::{CompositeScore, SignalInput, WeightedScorer};
use crate::types::{Condition, Signal, Trend, VolatilityRegime, VolumeTrend};

const HIGH_VOLATILITY_RATIO: f64 = 1.5;
const LOW_VOLATILITY_RATIO: f64 = 0.5;

/// Most recent value of every raw indicator; `None` while still warming up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestValues {
    pub sma: Option<f64>,
    pub ema: Option<f64>,
    pub ema_long: Option<f64>,
    pub volatility: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub rsi: Option<f64>,
    pub stochastic_k: Option<f64>,
    pub stoch_rsi_k: Option<f64>,
    pub stoch_rsi_d: Option<f64>,
}

/// Per-indicator signal on the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSignals {
    pub moving_average: Signal,
    pub bollinger: Signal,
    pub stochastic: Signal,
    pub stoch_rsi: Signal,
    pub volume: Option<Signal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub trend: Trend,
    pub volatility_regime: VolatilityRegime,
    pub rsi_condition: Option<Condition>,
    pub stoch_rsi_condition: Condition,
    pub stoch_rsi_trend: Trend,
    pub volume_trend: VolumeTrend,
    /// Bar-over-bar volume change in percent; undefined after a zero-volume bar.
    pub volume_change_pct: Option<f64>,
    pub latest: LatestValues,
    pub signals: LatestSignals,
    pub bollinger: BollingerRecommendation,
    pub levels: Option<SupportResistanceLevels>,
    pub patterns: PatternFlags,
    pub composite: CompositeScore,
}

impl Summary {
    /// Fails with `EmptySeries` below two candles.
    pub fn build(series: &CandleSeries, set: &IndicatorSet, scoring: &ScoringConfig) -> EngineResult<Self> {
        let n = series.len();
        let (Some(prev), Some(cur)) = (n.checked_sub(2).and_then(|i| series.get(i)), series.last()) else {
            return Err(EngineError::EmptySeries {
                required: 2,
                actual: n,
            });
        };
        let last = n - 1;

        let ma = &set.moving_averages;
        let bb = &set.bollinger;
        let sr = &set.stoch_rsi;

        let latest = LatestValues {
            sma: ma.sma[last],
            ema: ma.ema[last],
            ema_long: ma.ema_long[last],
            volatility: ma.volatility[last],
            bb_upper: bb.upper[last],
            bb_middle: bb.middle[last],
            bb_lower: bb.lower[last],
            rsi: set.rsi[last],
            stochastic_k: set.stochastic.k[last],
            stoch_rsi_k: sr.k[last],
            stoch_rsi_d: sr.d[last],
        };

        let signals = LatestSignals {
            moving_average: ma.signal[last],
            bollinger: bb.signal[last],
            stochastic: set.stochastic.signal[last],
            stoch_rsi: sr.signal[last],
            volume: set.volume_signal.as_ref().map(|v| v[last]),
        };

        let bollinger = bb.recommendation(series);
        let composite = composite_score(&signals, &bollinger, scoring);

        Ok(Self {
            timestamp: cur.timestamp,
            close: cur.close,
            trend: Trend::compare(latest.ema, latest.sma),
            volatility_regime: volatility_regime(latest.volatility, rolling::mean_defined(&ma.volatility)),
            rsi_condition: latest.rsi.map(rsi_condition),
            stoch_rsi_condition: stoch_zone(latest.stoch_rsi_k),
            stoch_rsi_trend: Trend::compare(latest.stoch_rsi_k, latest.stoch_rsi_d),
            volume_trend: volume_trend(prev.volume, cur.volume),
            volume_change_pct: (prev.volume != 0.0).then(|| (cur.volume - prev.volume) / prev.volume * 100.0),
            latest,
            signals,
            bollinger,
            levels: set.levels,
            patterns: set.patterns[last],
            composite,
        })
    }
}

fn volatility_regime(current: Option<f64>, mean: Option<f64>) -> VolatilityRegime {
    match (current, mean) {
        (Some(c), Some(m)) if c > m * HIGH_VOLATILITY_RATIO => VolatilityRegime::High,
        (Some(c), Some(m)) if c < m * LOW_VOLATILITY_RATIO => VolatilityRegime::Low,
        _ => VolatilityRegime::Medium,
    }
}

fn stoch_zone(k: Option<f64>) -> Condition {
    match k {
        Some(v) if v > OVERBOUGHT => Condition::Overbought,
        Some(v) if v < OVERSOLD => Condition::Oversold,
        _ => Condition::Neutral,
    }
}

fn volume_trend(prev: f64, cur: f64) -> VolumeTrend {
    if cur > prev {
        VolumeTrend::Increasing
    } else if cur < prev {
        VolumeTrend::Decreasing
    } else {
        VolumeTrend::Flat
    }
}

fn composite_score(
    signals: &LatestSignals,
    bollinger: &BollingerRecommendation,
    scoring: &ScoringConfig,
) -> CompositeScore {
    let mut inputs = vec![
        SignalInput::new("moving_average", scoring.moving_average_weight, signals.moving_average),
        SignalInput::new("bollinger", scoring.bollinger_weight, bollinger.signal),
        SignalInput::new("stoch_rsi", scoring.stoch_rsi_weight, signals.stoch_rsi),
        SignalInput::new("stochastic", scoring.stochastic_weight, signals.stochastic),
    ];
    if let Some(volume) = signals.volume {
        inputs.push(SignalInput::new("volume", scoring.volume_weight, volume));
    }
    WeightedScorer::from_config(scoring).score(&inputs)
}

// =============================================================================
// Plain-text report
// =============================================================================

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let l = &self.latest;
        writeln!(f, "=== Summary @ {} (close {:.2}) ===", self.timestamp.format(timestamp_format::FORMAT), self.close)?;
        writeln!(f, "Trend:              {}", self.trend)?;
        writeln!(f, "Volatility:         {} ({})", self.volatility_regime, opt(l.volatility))?;
        writeln!(
            f,
            "Moving averages:    SMA {} | EMA {} | EMA long {} -> {}",
            opt(l.sma),
            opt(l.ema),
            opt(l.ema_long),
            self.signals.moving_average
        )?;
        writeln!(
            f,
            "Bollinger:          {} / {} / {} -> {} ({})",
            opt(l.bb_lower),
            opt(l.bb_middle),
            opt(l.bb_upper),
            self.bollinger.signal,
            self.bollinger.reason
        )?;
        match self.rsi_condition {
            Some(condition) => writeln!(f, "RSI:                {} ({condition})", opt(l.rsi))?,
            None => writeln!(f, "RSI:                n/a")?,
        }
        writeln!(
            f,
            "Stochastic:         %K {} -> {}",
            opt(l.stochastic_k),
            self.signals.stochastic
        )?;
        writeln!(
            f,
            "Stochastic RSI:     %K {} | %D {} | {} / {} -> {}",
            opt(l.stoch_rsi_k),
            opt(l.stoch_rsi_d),
            self.stoch_rsi_condition,
            self.stoch_rsi_trend,
            self.signals.stoch_rsi
        )?;
        writeln!(
            f,
            "Volume:             {} ({}%)",
            self.volume_trend,
            opt(self.volume_change_pct)
        )?;
        match (self.levels, self.signals.volume) {
            (Some(levels), Some(volume)) => {
                writeln!(f, "Levels ({}):  {levels}", levels.session)?;
                writeln!(f, "Volume signal:      {volume}")?;
            }
            _ => writeln!(f, "Levels:             n/a (no candles in session)")?,
        }

        let mut patterns = Vec::new();
        if self.patterns.hammer {
            patterns.push("hammer");
        }
        if self.patterns.hanging_man {
            patterns.push("hanging man");
        }
        match self.patterns.engulfing {
            Some(Engulfing::Bullish) => patterns.push("bullish engulfing"),
            Some(Engulfing::Bearish) => patterns.push("bearish engulfing"),
            None => {}
        }
        if patterns.is_empty() {
            writeln!(f, "Patterns:           none")?;
        } else {
            writeln!(f, "Patterns:           {}", patterns.join(", "))?;
        }

        write!(
            f,
            "Recommendation:     {} (score {:+.2})",
            self.composite.decision, self.composite.total_score
        )
    }
}
