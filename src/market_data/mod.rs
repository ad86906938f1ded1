pub mod candle_series;
pub mod moex;
pub mod period;
pub mod source;
pub mod storage;

// Re-export the core types for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle_series::{Candle, CandleSeries, Upsert};
pub use moex::MoexClient;
pub use period::FetchPeriod;
pub use source::{CandleSource, SourceError};
pub use storage::Storage;

/// Synthetic fixtures shared by unit tests across the crate.
#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::{Candle, CandleSeries};

    pub(crate) fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 12).unwrap()
    }

    /// Bar `i` starts 10 minutes after bar `i - 1`, from 07:00 on the start date.
    pub(crate) fn bar_time(i: usize) -> NaiveDateTime {
        start_date().and_hms_opt(7, 0, 0).unwrap() + Duration::minutes(10 * i as i64)
    }

    /// Rows are `(open, high, low, close, volume)`.
    pub(crate) fn series_from_ohlcv(rows: &[(f64, f64, f64, f64, f64)]) -> CandleSeries {
        let candles = rows
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c, v))| Candle::new(bar_time(i), o, h, l, c, v).unwrap())
            .collect();
        CandleSeries::new(candles).unwrap()
    }

    /// Open at the previous close, half a point of wick each side, volume
    /// growing with the index.
    pub(crate) fn series_from_closes(closes: &[f64]) -> CandleSeries {
        let rows: Vec<_> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let o = if i == 0 { c } else { closes[i - 1] };
                (o, o.max(c) + 0.5, o.min(c) - 0.5, c, 1000.0 + i as f64)
            })
            .collect();
        series_from_ohlcv(&rows)
    }

    /// Deterministic random walk around 100 (linear congruential generator).
    pub(crate) fn pseudo_random_closes(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut price = 100.0;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let u = (state >> 33) as f64 / (1u64 << 31) as f64;
                price = (price * (1.0 + (u - 0.5) * 0.04)).max(1.0);
                price
            })
            .collect()
    }
}
