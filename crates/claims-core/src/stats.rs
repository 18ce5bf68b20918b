// ── Quantile helpers ──────────────────────────────────────────────────────────

/// Return a sorted copy of `values` (ascending, total order on `f64`).
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Compute the `q`-quantile (`0.0..=1.0`) of a **sorted** slice using
/// standard linear interpolation (the same algorithm used by NumPy's
/// `quantile` with the default `linear` method).
///
/// Returns `None` for an empty slice.
pub fn quantile(sorted_data: &[f64], q: f64) -> Option<f64> {
    let len = sorted_data.len();
    if len == 0 {
        return None;
    }
    if len == 1 {
        return Some(sorted_data[0]);
    }
    let q = q.clamp(0.0, 1.0);
    let rank = q * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted_data[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo]))
}

/// Median of an unsorted slice. Even-length input averages the two middle
/// values.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(&sorted(values), 0.5)
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
///
/// Undefined, and therefore `None`, for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sq / (n as f64 - 1.0)).sqrt())
}

/// Largest value; `None` for an empty slice.
pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

// ── Guarded ratios ────────────────────────────────────────────────────────────

/// `numerator / denominator`, or `None` when the result would be infinite or
/// NaN (zero denominator, non-finite input).
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    Some(numerator / denominator)
}

/// `part / whole * 100`, guarded like [`ratio`].
pub fn rate_pct(part: f64, whole: f64) -> Option<f64> {
    ratio(part, whole).map(|r| r * 100.0)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── quantile ─────────────────────────────────────────────────────────────

    #[test]
    fn test_quantile_empty_returns_none() {
        assert_eq!(quantile(&[], 0.99), None);
    }

    #[test]
    fn test_quantile_single_element() {
        assert_eq!(quantile(&[42.0], 0.99), Some(42.0));
        assert_eq!(quantile(&[42.0], 0.0), Some(42.0));
        assert_eq!(quantile(&[42.0], 1.0), Some(42.0));
    }

    #[test]
    fn test_quantile_even_median() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        // rank = 0.5 * 3 = 1.5 → interpolate between data[1]=2 and data[2]=3
        assert!((quantile(&data, 0.5).unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_quantile_extremes() {
        let data = vec![10.0, 20.0, 30.0];
        assert!((quantile(&data, 0.0).unwrap() - 10.0).abs() < 1e-9);
        assert!((quantile(&data, 1.0).unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_quantile_p99_hundred_values() {
        // 99 × 100 and one 10000: rank = 0.99 * 99 = 98.01
        // → 100 + 0.01 * (10000 - 100) = 199
        let mut data = vec![100.0; 99];
        data.push(10_000.0);
        let q = quantile(&data, 0.99).unwrap();
        assert!((q - 199.0).abs() < 1e-9, "q = {q}");
    }

    #[test]
    fn test_quantile_monotonic_when_value_raised() {
        let mut data: Vec<f64> = (1..=50).map(|x| x as f64 * 10.0).collect();
        let before = quantile(&sorted(&data), 0.99).unwrap();
        data[10] = before + 5_000.0;
        let after = quantile(&sorted(&data), 0.99).unwrap();
        assert!(after >= before, "before = {before}, after = {after}");
    }

    // ── median / mean / std / max ─────────────────────────────────────────────

    #[test]
    fn test_median_unsorted_input() {
        assert_eq!(median(&[500.0, 100.0, 100.0, 100.0]), Some(100.0));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[100.0, 100.0, 100.0, 500.0]), Some(200.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_sample_std() {
        // mean 5, squared deviations sum 32, n - 1 = 7
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let s = sample_std(&data).unwrap();
        assert!((s - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_sample_std_single_value_undefined() {
        assert_eq!(sample_std(&[12.0]), None);
        assert_eq!(sample_std(&[]), None);
    }

    #[test]
    fn test_max() {
        assert_eq!(max(&[1.0, 9.0, 3.0]), Some(9.0));
        assert_eq!(max(&[]), None);
    }

    // ── ratio / rate_pct ─────────────────────────────────────────────────────

    #[test]
    fn test_ratio_zero_denominator_is_none() {
        assert_eq!(ratio(10.0, 0.0), None);
        assert_eq!(ratio(0.0, 0.0), None);
        assert_eq!(ratio(10.0, f64::NAN), None);
    }

    #[test]
    fn test_rate_pct() {
        let r = rate_pct(2.0, 3.0).unwrap();
        assert!((r - 66.666_666_666).abs() < 1e-6);
        assert_eq!(rate_pct(1.0, 0.0), None);
    }
}
