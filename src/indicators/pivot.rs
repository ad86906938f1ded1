// =============================================================================
// Floor-trader pivot levels
// =============================================================================
//
// Computed from one trading-day partition of the series:
//
//   pivot = (session high + session low + last close) / 3
//   R1 = 2*pivot - low        S1 = 2*pivot - high
//   R2 = pivot + range        S2 = pivot - range
//   R3 = pivot + 2*range      S3 = pivot - 2*range      (range = high - low)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::market_data::CandleSeries;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportResistanceLevels {
    pub session: NaiveDate,
    pub pivot: f64,
    pub resistance_1: f64,
    pub resistance_2: f64,
    pub resistance_3: f64,
    pub support_1: f64,
    pub support_2: f64,
    pub support_3: f64,
}

/// Levels for the candles dated `session`. Fails with `EmptyPartition` when the
/// series has no candle on that date.
pub fn calculate_levels(series: &CandleSeries, session: NaiveDate) -> EngineResult<SupportResistanceLevels> {
    let candles = series.session(session);
    let last = candles
        .last()
        .ok_or(EngineError::EmptyPartition { date: session })?;

    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let range = high - low;
    let pivot = (high + low + last.close) / 3.0;

    Ok(SupportResistanceLevels {
        session,
        pivot,
        resistance_1: 2.0 * pivot - low,
        resistance_2: pivot + range,
        resistance_3: pivot + 2.0 * range,
        support_1: 2.0 * pivot - high,
        support_2: pivot - range,
        support_3: pivot - 2.0 * range,
    })
}

impl std::fmt::Display for SupportResistanceLevels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "S3 {:.2} | S2 {:.2} | S1 {:.2} | P {:.2} | R1 {:.2} | R2 {:.2} | R3 {:.2}",
            self.support_3,
            self.support_2,
            self.support_1,
            self.pivot,
            self.resistance_1,
            self.resistance_2,
            self.resistance_3
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::test_support::{series_from_ohlcv, start_date};

    /// 20 bars on one day with high_max 110, low_min 90 and last close 100.
    fn session_series() -> CandleSeries {
        let mut rows: Vec<(f64, f64, f64, f64, f64)> =
            (0..19).map(|i| (100.0, 101.0 + (i % 3) as f64, 99.0 - (i % 4) as f64, 100.5, 10.0)).collect();
        rows[5] = (100.0, 110.0, 99.0, 105.0, 10.0);
        rows[11] = (100.0, 101.0, 90.0, 95.0, 10.0);
        rows.push((100.0, 100.0, 100.0, 100.0, 10.0));
        series_from_ohlcv(&rows)
    }

    #[test]
    fn classic_levels() {
        let series = session_series();
        let levels = calculate_levels(&series, start_date()).unwrap();
        assert!((levels.pivot - 100.0).abs() < 1e-10);
        assert!((levels.resistance_1 - 110.0).abs() < 1e-10);
        assert!((levels.support_1 - 90.0).abs() < 1e-10);
        assert!((levels.resistance_2 - 120.0).abs() < 1e-10);
        assert!((levels.support_2 - 80.0).abs() < 1e-10);
        assert!((levels.resistance_3 - 140.0).abs() < 1e-10);
        assert!((levels.support_3 - 60.0).abs() < 1e-10);
    }

    #[test]
    fn levels_are_ordered() {
        let levels = calculate_levels(&session_series(), start_date()).unwrap();
        assert!(levels.support_3 <= levels.support_2);
        assert!(levels.support_2 <= levels.support_1);
        assert!(levels.support_1 <= levels.pivot);
        assert!(levels.pivot <= levels.resistance_1);
        assert!(levels.resistance_1 <= levels.resistance_2);
        assert!(levels.resistance_2 <= levels.resistance_3);
    }

    #[test]
    fn empty_partition() {
        let other_day = start_date().succ_opt().unwrap();
        let err = calculate_levels(&session_series(), other_day).unwrap_err();
        assert!(matches!(err, EngineError::EmptyPartition { date } if date == other_day));
    }
}
