// =============================================================================
// Signals Module
// =============================================================================
//
// Signal aggregation over a computed indicator set:
// - Weighted ensemble scoring (composite recommendation)
// - Summary of trend, volatility, oscillator zones and latest values

pub mod summary;
pub mod weighted_score;
