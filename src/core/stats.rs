//! Descriptive statistics shared by the metric calculators
//!
//! Every helper returns 0.0 instead of NaN/inf when its input is too small
//! or degenerate, so results can flow straight into reports.

/// Arithmetic mean (0.0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mean_value = mean(values);
    let variance = values
        .iter()
        .map(|v| (v - mean_value).powi(2))
        .sum::<f64>()
        / values.len() as f64;

    variance.sqrt()
}

/// Percentile with linear interpolation between closest ranks
///
/// # Arguments
/// * `values` - Sample (any order)
/// * `pct` - Percentile in 0-100
///
/// # Examples
/// ```
/// use betlens::core::stats::percentile;
/// let p = percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 5.0);
/// assert!((p - 1.2).abs() < 1e-12);
/// ```
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Pearson correlation coefficient
///
/// Returns 0.0 when fewer than two pairs are given, the slices differ in
/// length, or either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }

    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    // Rounding residue of a constant series counts as zero variance
    let n = xs.len() as f64;
    let negligible = |var: f64, m: f64| var <= f64::EPSILON * n * m * m;
    if negligible(var_x, mean_x) || negligible(var_y, mean_y) {
        return 0.0;
    }

    let correlation = covariance / (var_x.sqrt() * var_y.sqrt());
    if correlation.is_finite() {
        correlation
    } else {
        0.0
    }
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Ratio on the 0-1 scale expressed as a percentage rounded to 2 decimals
pub fn pct(ratio: f64) -> f64 {
    round_to(ratio * 100.0, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_population() {
        // Population std of [2,4,4,4,5,5,7,9] is exactly 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&values) - 2.0).abs() < 1e-12);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[3.0]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, -1.0, 1.0];
        // sorted [-1, 1, 1], rank 0.1 -> -1 + 2 * 0.1
        assert!((percentile(&values, 5.0) - (-0.8)).abs() < 1e-12);
        assert!((percentile(&values, 50.0) - 1.0).abs() < 1e-12);
        assert_eq!(percentile(&[], 5.0), 0.0);
        assert_eq!(percentile(&[0.7], 5.0), 0.7);
    }

    #[test]
    fn test_pearson_perfect() {
        let xs = [0.01, 0.02, 0.03];
        let ys = [0.0, 0.5, 1.0];
        assert!((pearson(&xs, &ys) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_degenerate() {
        assert_eq!(pearson(&[1.0], &[1.0]), 0.0);
        assert_eq!(pearson(&[0.1, 0.1, 0.1], &[1.0, 0.0, 1.0]), 0.0);
        assert_eq!(pearson(&[0.1, 0.2], &[1.0]), 0.0);
        assert_eq!(pearson(&[1.0, 0.0, 1.0], &[0.3, 0.3, 0.3]), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert!((round_to(33.333333, 2) - 33.33).abs() < 1e-12);
        assert!((round_to(0.16004, 4) - 0.16).abs() < 1e-12);
        assert!((pct(2.0 / 3.0) - 66.67).abs() < 1e-12);
    }
}
