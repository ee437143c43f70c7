use crate::regression::fit_log_linear;
use predictability_core::{BreakTestResult, ScoringConfig};

/// Heuristic two-half trend-break test.
///
/// Splits the series at its midpoint, fits each half and the full window
/// independently, and flags a break on a large fit-quality gap, a large
/// log-slope gap, or a strong global fit paired with a weak half (the
/// level-shift a single full-window regression averages away). Not a formal
/// hypothesis test; a fixed indicative confidence is attached when it fires.
pub fn test_structural_break(series: &[f64], config: &ScoringConfig) -> BreakTestResult {
    if series.len() < config.break_min_points {
        return BreakTestResult::none();
    }

    let mid = series.len() / 2;
    let first = fit_log_linear(&series[..mid]);
    let second = fit_log_linear(&series[mid..]);
    let full = fit_log_linear(series);

    let r_squared_gap = (first.r_squared - second.r_squared).abs() > config.break_r_squared_gap;
    let slope_gap = (first.slope - second.slope).abs() > config.break_slope_gap;
    let masked_level_shift = full.r_squared > config.break_strong_full_fit
        && (first.r_squared < config.break_weak_half_fit
            || second.r_squared < config.break_weak_half_fit);

    if r_squared_gap || slope_gap || masked_level_shift {
        BreakTestResult {
            has_break: true,
            break_year_index: Some(mid),
            confidence: config.break_confidence,
        }
    } else {
        BreakTestResult::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn two_regime_series(first_growth: f64, second_growth: f64, n: usize) -> Vec<f64> {
        let mut series = vec![10.0];
        for i in 1..n {
            let growth = if i < n / 2 { first_growth } else { second_growth };
            series.push(series.last().unwrap() * (1.0 + growth));
        }
        series
    }

    #[test]
    fn test_short_series_never_breaks() {
        let series = two_regime_series(0.05, 0.40, 7);
        let result = test_structural_break(&series, &config());
        assert!(!result.has_break);
        assert_eq!(result.break_year_index, None);
    }

    #[test]
    fn test_stable_growth_has_no_break() {
        let series: Vec<f64> = (0..10).map(|i| 10.0 * 1.08_f64.powi(i)).collect();
        let result = test_structural_break(&series, &config());
        assert!(!result.has_break);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_growth_regime_shift_fires_slope_gap() {
        // 5%/yr then 40%/yr: each half fits cleanly but the slopes diverge
        let series = two_regime_series(0.05, 0.40, 10);
        let result = test_structural_break(&series, &config());

        assert!(result.has_break);
        assert_eq!(result.break_year_index, Some(5));
        assert_eq!(result.confidence, config().break_confidence);
    }

    #[test]
    fn test_noisy_half_fires_fit_quality_gap() {
        // Clean first half, erratic second half
        let mut series: Vec<f64> = (0..5).map(|i| 10.0 * 1.05_f64.powi(i)).collect();
        series.extend_from_slice(&[20.0, 9.0, 22.0, 8.0, 24.0]);
        let result = test_structural_break(&series, &config());

        assert!(result.has_break);
    }
}
