// =============================================================================
// Shared label types used across the indicator engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Discrete trading signal on a symmetric scale. Each indicator uses the
/// subset it needs (most only emit Sell / Neutral / Buy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    StrongSell,
    Sell,
    Neutral,
    Buy,
    StrongBuy,
}

impl Signal {
    /// Position on the -2..=2 scale.
    pub fn value(self) -> i8 {
        match self {
            Self::StrongSell => -2,
            Self::Sell => -1,
            Self::Neutral => 0,
            Self::Buy => 1,
            Self::StrongBuy => 2,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == Self::Neutral
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::Neutral
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongSell => write!(f, "STRONG SELL"),
            Self::Sell => write!(f, "SELL"),
            Self::Neutral => write!(f, "NEUTRAL"),
            Self::Buy => write!(f, "BUY"),
            Self::StrongBuy => write!(f, "STRONG BUY"),
        }
    }
}

/// Direction of one line relative to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Upward,
    Downward,
    Sideways,
}

impl Trend {
    /// Compare `fast` against `slow`; undefined inputs read as sideways.
    pub fn compare(fast: Option<f64>, slow: Option<f64>) -> Self {
        match (fast, slow) {
            (Some(a), Some(b)) if a > b => Self::Upward,
            (Some(a), Some(b)) if a < b => Self::Downward,
            _ => Self::Sideways,
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upward => write!(f, "Upward"),
            Self::Downward => write!(f, "Downward"),
            Self::Sideways => write!(f, "Sideways"),
        }
    }
}

/// Current volatility relative to the series average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityRegime {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Oscillator zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Overbought,
    Neutral,
    Oversold,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overbought => write!(f, "Overbought"),
            Self::Neutral => write!(f, "Neutral"),
            Self::Oversold => write!(f, "Oversold"),
        }
    }
}

/// Bar-over-bar volume direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Flat,
}

impl std::fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increasing => write!(f, "Increasing"),
            Self::Decreasing => write!(f, "Decreasing"),
            Self::Flat => write!(f, "Flat"),
        }
    }
}
