// =============================================================================
// Rolling Statistics
// =============================================================================
//
// Windowed primitives shared by every indicator. Each takes an aligned series
// (`None` = undefined) and returns a series of the same length:
//
//   rolling_*  — position i is defined once a full window ending at i is
//                available, i.e. the first `window - 1` positions are `None`.
//                A window containing an undefined value is itself undefined.
//   ewm        — recursive EMA with alpha = 2 / (span + 1), seeded with the
//                first defined value. Undefined inputs after the seed carry
//                the previous value forward.
//
// `window > len` is not an error: the result is simply all `None`.
// =============================================================================

/// An indicator sequence aligned to its source series.
pub type Series = Vec<Option<f64>>;

/// Lift a plain slice into an aligned series with every position defined.
pub fn defined(values: &[f64]) -> Series {
    values.iter().copied().map(Some).collect()
}

/// Apply `f` to every full window of defined values. `min_periods` lets a
/// partially-filled leading window (or one with gaps) still produce a value
/// when at least that many values are present.
fn rolling_apply<F>(values: &[Option<f64>], window: usize, min_periods: usize, f: F) -> Series
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if window == 0 || min_periods == 0 || min_periods > window {
        return out;
    }

    let mut buf: Vec<f64> = Vec::with_capacity(window);
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        buf.clear();
        buf.extend(values[start..=i].iter().flatten());
        if buf.len() >= min_periods {
            out[i] = f(&buf).filter(|v| v.is_finite());
        }
    }
    out
}

fn mean(window: &[f64]) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
fn sample_std(window: &[f64]) -> Option<f64> {
    if window.len() < 2 {
        return None;
    }
    let m = mean(window)?;
    let var = window.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (window.len() - 1) as f64;
    Some(var.sqrt())
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Series {
    rolling_apply(values, window, window, mean)
}

/// Rolling mean that emits a value as soon as `min_periods` values are inside
/// the window.
pub fn rolling_mean_min_periods(values: &[Option<f64>], window: usize, min_periods: usize) -> Series {
    rolling_apply(values, window, min_periods, mean)
}

pub fn rolling_std(values: &[Option<f64>], window: usize) -> Series {
    rolling_apply(values, window, window, sample_std)
}

pub fn rolling_min(values: &[Option<f64>], window: usize) -> Series {
    rolling_apply(values, window, window, |w| w.iter().copied().reduce(f64::min))
}

pub fn rolling_max(values: &[Option<f64>], window: usize) -> Series {
    rolling_apply(values, window, window, |w| w.iter().copied().reduce(f64::max))
}

/// Exponentially weighted mean with span-derived smoothing
/// (`alpha = 2 / (span + 1)`), no bias adjustment.
pub fn ewm(values: &[Option<f64>], span: usize) -> Series {
    let mut out = vec![None; values.len()];
    if span == 0 {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);

    let mut prev: Option<f64> = None;
    for (i, value) in values.iter().enumerate() {
        let next = match (prev, value) {
            (None, v) => *v,
            (Some(p), Some(v)) => Some(alpha * v + (1.0 - alpha) * p),
            (Some(p), None) => Some(p),
        };
        prev = next.filter(|v| v.is_finite()).or(prev);
        out[i] = prev;
    }
    out
}

/// First difference: `x[i] - x[i-1]`; position 0 is undefined.
pub fn diff(values: &[Option<f64>]) -> Series {
    let mut out = vec![None; values.len()];
    for i in 1..values.len() {
        if let (Some(prev), Some(cur)) = (values[i - 1], values[i]) {
            out[i] = Some(cur - prev);
        }
    }
    out
}

/// Fractional change `x[i] / x[i-1] - 1`; undefined at 0 and after a zero.
pub fn pct_change(values: &[Option<f64>]) -> Series {
    let mut out = vec![None; values.len()];
    for i in 1..values.len() {
        if let (Some(prev), Some(cur)) = (values[i - 1], values[i]) {
            if prev != 0.0 {
                out[i] = Some(cur / prev - 1.0);
            }
        }
    }
    out
}

/// Value of the most recent defined position, if any.
pub fn last_defined(values: &[Option<f64>]) -> Option<f64> {
    values.iter().rev().flatten().next().copied()
}

/// Mean over every defined position.
pub fn mean_defined(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    mean(&present)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        matches!(a, Some(v) if (v - b).abs() < 1e-9)
    }

    #[test]
    fn rolling_mean_warmup_is_undefined() {
        let s = rolling_mean(&defined(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3);
        assert_eq!(s.len(), 5);
        assert!(s[0].is_none());
        assert!(s[1].is_none());
        assert!(approx(s[2], 2.0));
        assert!(approx(s[3], 3.0));
        assert!(approx(s[4], 4.0));
    }

    #[test]
    fn window_longer_than_series_is_all_undefined() {
        let s = rolling_mean(&defined(&[1.0, 2.0]), 5);
        assert_eq!(s, vec![None, None]);
        let s = rolling_std(&defined(&[1.0, 2.0]), 5);
        assert_eq!(s, vec![None, None]);
    }

    #[test]
    fn zero_window_is_all_undefined() {
        assert_eq!(rolling_max(&defined(&[1.0, 2.0]), 0), vec![None, None]);
        assert_eq!(ewm(&defined(&[1.0, 2.0]), 0), vec![None, None]);
    }

    #[test]
    fn gap_inside_window_makes_it_undefined() {
        let input = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let s = rolling_mean(&input, 2);
        assert!(s[1].is_none());
        assert!(s[2].is_none());
        assert!(approx(s[3], 3.5));
    }

    #[test]
    fn min_periods_fills_leading_window() {
        let s = rolling_mean_min_periods(&defined(&[2.0, 4.0, 6.0, 8.0]), 3, 1);
        assert!(approx(s[0], 2.0));
        assert!(approx(s[1], 3.0));
        assert!(approx(s[2], 4.0));
        assert!(approx(s[3], 6.0));
    }

    #[test]
    fn rolling_std_is_sample_std() {
        // [2, 4, 4, 4, 5, 5, 7, 9]: population std 2.0, sample std sqrt(32/7).
        let s = rolling_std(&defined(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 8);
        assert!(approx(s[7], (32.0_f64 / 7.0).sqrt()));
    }

    #[test]
    fn rolling_std_window_one_is_undefined() {
        let s = rolling_std(&defined(&[1.0, 2.0, 3.0]), 1);
        assert_eq!(s, vec![None, None, None]);
    }

    #[test]
    fn rolling_min_max() {
        let input = defined(&[5.0, 3.0, 8.0, 1.0, 4.0]);
        let lo = rolling_min(&input, 3);
        let hi = rolling_max(&input, 3);
        assert!(approx(lo[2], 3.0) && approx(hi[2], 8.0));
        assert!(approx(lo[3], 1.0) && approx(hi[3], 8.0));
        assert!(approx(lo[4], 1.0) && approx(hi[4], 8.0));
    }

    #[test]
    fn ewm_matches_recursive_definition() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let s = ewm(&defined(&closes), 3);
        let alpha = 0.5;
        let mut expected = 1.0;
        assert!(approx(s[0], expected));
        for (i, &c) in closes.iter().enumerate().skip(1) {
            expected = alpha * c + (1.0 - alpha) * expected;
            assert!(approx(s[i], expected), "index {i}");
        }
    }

    #[test]
    fn ewm_seeds_on_first_defined_value() {
        let s = ewm(&[None, None, Some(10.0), Some(20.0), None], 1);
        assert_eq!(s[0], None);
        assert_eq!(s[1], None);
        assert!(approx(s[2], 10.0));
        assert!(approx(s[3], 20.0));
        assert!(approx(s[4], 20.0));
    }

    #[test]
    fn diff_and_pct_change() {
        let input = defined(&[10.0, 12.0, 0.0, 3.0]);
        let d = diff(&input);
        assert_eq!(d[0], None);
        assert!(approx(d[1], 2.0));
        assert!(approx(d[2], -12.0));

        let p = pct_change(&input);
        assert_eq!(p[0], None);
        assert!(approx(p[1], 0.2));
        assert!(approx(p[2], -1.0));
        assert_eq!(p[3], None);
    }

    #[test]
    fn last_and_mean_defined() {
        let input = vec![None, Some(2.0), Some(4.0), None];
        assert_eq!(last_defined(&input), Some(4.0));
        assert!(approx(mean_defined(&input), 3.0));
        assert_eq!(last_defined(&[None, None]), None);
        assert_eq!(mean_defined(&[]), None);
    }
}
