// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free transforms from a `CandleSeries` to aligned indicator
// sequences. Every output has one entry per candle; positions without enough
// history are `None` rather than a numeric placeholder.

pub mod bollinger;
pub mod candlestick;
pub mod moving_average;
pub mod pivot;
pub mod rolling;
pub mod rsi;
pub mod stoch_rsi;
pub mod stochastic;
pub mod volume;

pub use rolling::Series;

/// Direction in which a fast line crossed a slow line at a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Above,
    Below,
}

/// Detect a crossing at bar `i` by comparing it with bar `i - 1`.
///
/// Above: previous `fast <= slow` and current `fast > slow`.
/// Below: previous `fast >= slow` and current `fast < slow`.
/// Bar 0 and bars where any of the four values is undefined never cross.
pub fn crossing(fast: &[Option<f64>], slow: &[Option<f64>], i: usize) -> Option<Crossing> {
    if i == 0 || i >= fast.len() || i >= slow.len() {
        return None;
    }
    let (pf, ps, cf, cs) = (fast[i - 1]?, slow[i - 1]?, fast[i]?, slow[i]?);
    if pf <= ps && cf > cs {
        Some(Crossing::Above)
    } else if pf >= ps && cf < cs {
        Some(Crossing::Below)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_detects_both_directions() {
        let fast = vec![Some(1.0), Some(3.0), Some(1.0)];
        let slow = vec![Some(2.0), Some(2.0), Some(2.0)];
        assert_eq!(crossing(&fast, &slow, 0), None);
        assert_eq!(crossing(&fast, &slow, 1), Some(Crossing::Above));
        assert_eq!(crossing(&fast, &slow, 2), Some(Crossing::Below));
    }

    #[test]
    fn touching_then_leaving_counts_as_crossing() {
        let fast = vec![Some(2.0), Some(2.5)];
        let slow = vec![Some(2.0), Some(2.0)];
        assert_eq!(crossing(&fast, &slow, 1), Some(Crossing::Above));
    }

    #[test]
    fn undefined_neighbour_never_crosses() {
        let fast = vec![None, Some(3.0)];
        let slow = vec![Some(2.0), Some(2.0)];
        assert_eq!(crossing(&fast, &slow, 1), None);
    }
}
