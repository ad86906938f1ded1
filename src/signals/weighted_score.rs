// =============================================================================
// Weighted Ensemble Scorer — composite recommendation
// =============================================================================
//
//   score = Σ weight_i × signal_i        (signal_i on the -2..=2 scale)
//
//   score >=  strong_threshold  => StrongBuy
//   score >=  threshold         => Buy
//   score <= -strong_threshold  => StrongSell
//   score <= -threshold         => Sell
//   otherwise                   => Neutral

use serde::{Deserialize, Serialize};

use crate::runtime_config::ScoringConfig;
use crate::types::Signal;

/// A single signal input to the scoring engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalInput {
    pub name: String,
    pub weight: f64,
    pub signal: Signal,
}

impl SignalInput {
    pub fn new(name: impl Into<String>, weight: f64, signal: Signal) -> Self {
        Self {
            name: name.into(),
            weight,
            signal,
        }
    }
}

/// The contribution of a single signal to the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
    pub name: String,
    pub weight: f64,
    pub signal: Signal,
    pub contribution: f64,
}

/// Result of the weighted scoring pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub total_score: f64,
    pub decision: Signal,
    pub signal_contributions: Vec<SignalContribution>,
}

/// The main weighted scoring engine.
#[derive(Debug, Clone)]
pub struct WeightedScorer {
    /// Minimum |score| for a Buy / Sell.
    pub threshold: f64,
    /// Minimum |score| for a StrongBuy / StrongSell.
    pub strong_threshold: f64,
}

impl WeightedScorer {
    pub fn new(threshold: f64, strong_threshold: f64) -> Self {
        Self {
            threshold,
            strong_threshold,
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(config.threshold, config.strong_threshold)
    }

    pub fn score(&self, signals: &[SignalInput]) -> CompositeScore {
        let mut contributions = Vec::with_capacity(signals.len());
        let mut total_score = 0.0;

        for input in signals {
            let contribution = input.weight * f64::from(input.signal.value());

            contributions.push(SignalContribution {
                name: input.name.clone(),
                weight: input.weight,
                signal: input.signal,
                contribution,
            });

            total_score += contribution;
        }

        CompositeScore {
            total_score,
            decision: self.decide(total_score),
            signal_contributions: contributions,
        }
    }

    fn decide(&self, score: f64) -> Signal {
        if score >= self.strong_threshold {
            Signal::StrongBuy
        } else if score >= self.threshold {
            Signal::Buy
        } else if score <= -self.strong_threshold {
            Signal::StrongSell
        } else if score <= -self.threshold {
            Signal::Sell
        } else {
            Signal::Neutral
        }
    }
}

impl Default for WeightedScorer {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}
