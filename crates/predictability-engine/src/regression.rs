use predictability_core::RegressionResult;

/// Below this many usable points a fit carries no signal
const MIN_FIT_POINTS: usize = 3;

/// Fit a log-linear trend to a series by ordinary least squares.
///
/// Non-positive values are dropped before the log transform and the time
/// index compresses over the retained points (1-based), so a gap shortens
/// the x-axis rather than leaving a hole. R² is computed in log space and
/// clamped to [0, 1] against numerical drift.
pub fn fit_log_linear(series: &[f64]) -> RegressionResult {
    let logs: Vec<f64> = series
        .iter()
        .filter(|&&v| v > 0.0)
        .map(|v| v.ln())
        .collect();

    if logs.len() < MIN_FIT_POINTS {
        return RegressionResult::degenerate();
    }

    let n = logs.len() as f64;
    let sum_x: f64 = (1..=logs.len()).sum::<usize>() as f64;
    let sum_y: f64 = logs.iter().sum();
    let sum_xy: f64 = logs
        .iter()
        .enumerate()
        .map(|(i, &y)| (i + 1) as f64 * y)
        .sum();
    let sum_x2: f64 = (1..=logs.len()).map(|i| (i * i) as f64).sum();

    let denom = n * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return RegressionResult::degenerate();
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    let mean_y = sum_y / n;

    let ss_tot: f64 = logs.iter().map(|&y| (y - mean_y) * (y - mean_y)).sum();

    // A constant series fits its own mean exactly; ln/rounding leaves
    // ss_tot at noise scale rather than zero, and the ratio ss_res/ss_tot
    // is meaningless there
    let noise_floor = n * f64::EPSILON * (1.0 + mean_y * mean_y);
    if ss_tot <= noise_floor {
        return RegressionResult {
            r_squared: 1.0,
            rmse: 0.0,
            residuals: vec![0.0; logs.len()],
            slope,
            intercept,
        };
    }

    let mut ss_res = 0.0;
    let residuals: Vec<f64> = logs
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let predicted = intercept + slope * (i + 1) as f64;
            let residual = y - predicted;
            ss_res += residual * residual;
            residual
        })
        .collect();

    let r_squared = (1.0 - ss_res / ss_tot).clamp(0.0, 1.0);
    let rmse = (ss_res / n).sqrt();

    RegressionResult {
        r_squared,
        rmse,
        residuals,
        slope,
        intercept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometric_series(start: f64, growth: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start * (1.0 + growth).powi(i as i32)).collect()
    }

    #[test]
    fn test_perfect_geometric_series_fits_exactly() {
        for growth in [-0.5, 0.02, 0.10, 0.40] {
            let series = geometric_series(10.0, growth, 10);
            let fit = fit_log_linear(&series);

            assert!(fit.r_squared > 0.999, "growth {}: r2 {}", growth, fit.r_squared);
            assert!(fit.rmse < 1e-9);
            assert!((fit.slope - (1.0 + growth).ln()).abs() < 1e-9);
            assert_eq!(fit.residuals.len(), 10);
        }
    }

    #[test]
    fn test_constant_series_is_fully_predictable() {
        // ln/mean rounding leaves ss_tot at ~1e-31, not exactly zero; the
        // flat series must still earn full trend credit
        for value in [1.0, 5.0, 123.456] {
            let fit = fit_log_linear(&[value; 10]);
            assert_eq!(fit.r_squared, 1.0, "value {}", value);
            assert_eq!(fit.rmse, 0.0);
            assert!(fit.residuals.iter().all(|&r| r == 0.0));
            assert!(fit.slope.abs() < 1e-12);
        }
    }

    #[test]
    fn test_fewer_than_three_usable_points_is_degenerate() {
        let fit = fit_log_linear(&[1.0, 2.0]);
        assert!(fit.is_degenerate());
        assert_eq!(fit.r_squared, 0.0);
        assert!(fit.rmse.is_infinite());

        // Non-positive entries do not count as usable
        let fit = fit_log_linear(&[1.0, -1.0, 0.0, 2.0]);
        assert!(fit.is_degenerate());
    }

    #[test]
    fn test_non_positive_values_compress_the_time_index() {
        // Dropping the zero must leave the same fit as the clean series
        let clean = geometric_series(10.0, 0.10, 9);
        let mut gapped = clean.clone();
        gapped.insert(4, 0.0);

        let clean_fit = fit_log_linear(&clean);
        let gapped_fit = fit_log_linear(&gapped);

        assert_eq!(gapped_fit.residuals.len(), 9);
        assert!((gapped_fit.slope - clean_fit.slope).abs() < 1e-12);
        assert!((gapped_fit.r_squared - clean_fit.r_squared).abs() < 1e-12);
    }

    #[test]
    fn test_noisy_series_has_lower_r_squared() {
        let mut series = geometric_series(10.0, 0.10, 10);
        series[3] *= 1.8;
        series[7] *= 0.5;
        let fit = fit_log_linear(&series);

        assert!(fit.r_squared < 0.95);
        assert!(fit.rmse > 0.05);
    }
}
