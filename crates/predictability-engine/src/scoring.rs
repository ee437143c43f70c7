use predictability_core::{CompositeScore, ScoringConfig, SeriesDiagnostics};

/// Monotone-decreasing normalization into [0, 1]: zero dispersion maps to
/// 1.0, the scale (or peer max) and beyond maps to 0.0.
fn normalize_inverse(value: f64, peer_range: Option<(f64, f64)>, fallback_scale: f64) -> f64 {
    match peer_range {
        Some((min, max)) if max > min => (1.0 - (value - min) / (max - min)).clamp(0.0, 1.0),
        _ => (1.0 - value / fallback_scale).clamp(0.0, 1.0),
    }
}

/// Blend both series' regression and volatility results into one composite
/// score, then apply the outlier and break penalties. The final score is
/// floored at zero.
pub fn composite_score(
    revenue: &SeriesDiagnostics,
    ebitda: &SeriesDiagnostics,
    config: &ScoringConfig,
) -> CompositeScore {
    let trend_component =
        0.5 * revenue.regression.r_squared + 0.5 * ebitda.regression.r_squared;

    let worst_sigma = revenue.growth.sigma.max(ebitda.growth.sigma);
    let worst_rmse = revenue.regression.rmse.max(ebitda.regression.rmse);
    let smoothness_component =
        normalize_inverse(worst_sigma, config.peer_sigma_range, config.sigma_scale);
    let residual_component =
        normalize_inverse(worst_rmse, config.peer_rmse_range, config.rmse_scale);

    let raw = config.trend_weight * trend_component
        + config.smoothness_weight * smoothness_component
        + config.residual_weight * residual_component;

    let outlier_penalty = if revenue.growth.has_outliers || ebitda.growth.has_outliers {
        config.outlier_penalty
    } else {
        0.0
    };
    let break_penalty = if revenue.break_test.has_break || ebitda.break_test.has_break {
        config.break_penalty
    } else {
        0.0
    };

    CompositeScore {
        trend_component,
        smoothness_component,
        residual_component,
        outlier_penalty,
        break_penalty,
        raw,
        final_score: (raw - outlier_penalty - break_penalty).max(0.0),
    }
}

/// Maps a composite score to a star value, either by percentile rank against
/// a peer universe or directly through the score bands. Both tables are
/// total and ordered; the floor star is the catch-all band.
#[derive(Debug, Clone)]
pub enum StarMapper {
    ByScore,
    ByPercentile { peers: Vec<f64> },
}

impl StarMapper {
    pub fn map(&self, score: f64, config: &ScoringConfig) -> f64 {
        match self {
            StarMapper::ByPercentile { peers } if !peers.is_empty() => {
                let below = peers.iter().filter(|&&p| p < score).count();
                let percentile = below as f64 / peers.len() as f64;
                lookup_band(&config.percentile_bands, percentile, config.floor_stars)
            }
            // An empty universe falls back to the direct table
            _ => lookup_band(&config.score_bands, score, config.floor_stars),
        }
    }
}

fn lookup_band(bands: &[(f64, f64)], value: f64, floor_stars: f64) -> f64 {
    bands
        .iter()
        .find(|&&(_, min)| value >= min)
        .map(|&(stars, _)| stars)
        .unwrap_or(floor_stars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{breaks, regression, volatility};

    fn diagnostics(series: &[f64], config: &ScoringConfig) -> SeriesDiagnostics {
        SeriesDiagnostics {
            regression: regression::fit_log_linear(series),
            growth: volatility::analyze_growth(
                series,
                config.winsor_bound,
                config.outlier_z_threshold,
            ),
            break_test: breaks::test_structural_break(series, config),
        }
    }

    fn geometric(growth: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| 10.0 * (1.0 + growth).powi(i as i32)).collect()
    }

    #[test]
    fn test_perfect_series_scores_full_raw() {
        let config = ScoringConfig::default();
        let revenue = diagnostics(&geometric(0.10, 10), &config);
        let ebitda = diagnostics(&geometric(0.10, 10), &config);
        let score = composite_score(&revenue, &ebitda, &config);

        assert!(score.trend_component > 0.999);
        assert!(score.smoothness_component > 0.999);
        assert!(score.residual_component > 0.999);
        assert_eq!(score.outlier_penalty, 0.0);
        assert_eq!(score.break_penalty, 0.0);
        assert!(score.final_score > 0.99);
    }

    #[test]
    fn test_degenerate_series_depresses_score() {
        let config = ScoringConfig::default();
        let revenue = diagnostics(&geometric(0.10, 10), &config);
        // Too few usable points: degenerate regression, infinite rmse
        let ebitda = diagnostics(&[1.0, 2.0], &config);
        let score = composite_score(&revenue, &ebitda, &config);

        assert_eq!(score.residual_component, 0.0);
        assert!(score.trend_component <= 0.5);
        assert!(score.final_score < 0.6);
    }

    #[test]
    fn test_break_penalty_applies_once_for_either_series() {
        let config = ScoringConfig::default();
        let mut broken = geometric(0.05, 5);
        for _ in 0..5 {
            broken.push(broken.last().unwrap() * 1.40);
        }
        let revenue = diagnostics(&broken, &config);
        let ebitda = diagnostics(&geometric(0.10, 10), &config);
        let score = composite_score(&revenue, &ebitda, &config);

        assert!(revenue.break_test.has_break);
        assert_eq!(score.break_penalty, config.break_penalty);
        assert!((score.raw - score.final_score - score.break_penalty).abs() < 1e-12);
    }

    #[test]
    fn test_final_score_is_floored_at_zero() {
        // Adversarial penalty larger than any possible raw score
        let mut config = ScoringConfig::default();
        config.outlier_penalty = 1.5;

        let mut series = vec![10.0];
        for _ in 0..13 {
            series.push(series.last().unwrap() * 1.05);
        }
        series.push(series.last().unwrap() * 2.0);
        let diag = diagnostics(&series, &config);
        assert!(diag.growth.has_outliers);

        let score = composite_score(&diag, &diag, &config);
        assert!(score.raw - score.outlier_penalty - score.break_penalty < 0.0);
        assert_eq!(score.final_score, 0.0);
    }

    #[test]
    fn test_lower_dispersion_never_scores_lower_smoothness() {
        let config = ScoringConfig::default();
        let calm = diagnostics(&geometric(0.08, 10), &config);
        let mut noisy_series = geometric(0.08, 10);
        noisy_series[4] *= 1.5;
        let noisy = diagnostics(&noisy_series, &config);

        let calm_score = composite_score(&calm, &calm, &config);
        let noisy_score = composite_score(&noisy, &noisy, &config);
        assert!(calm_score.smoothness_component >= noisy_score.smoothness_component);
    }

    #[test]
    fn test_direct_score_mapping_covers_the_scale() {
        let config = ScoringConfig::default();
        let mapper = StarMapper::ByScore;

        assert_eq!(mapper.map(0.95, &config), 5.0);
        assert_eq!(mapper.map(0.90, &config), 5.0);
        assert_eq!(mapper.map(0.72, &config), 4.0);
        assert_eq!(mapper.map(0.45, &config), 2.5);
        // Lowest band has no floor
        assert_eq!(mapper.map(0.0, &config), 1.0);
        assert_eq!(mapper.map(-1.0, &config), 1.0);
    }

    #[test]
    fn test_percentile_mapping_ranks_against_peers() {
        let config = ScoringConfig::default();
        let peers: Vec<f64> = (0..1000).map(|i| i as f64 / 1000.0).collect();

        let top = StarMapper::ByPercentile { peers: peers.clone() };
        assert_eq!(top.map(0.999, &config), 5.0);
        assert_eq!(top.map(0.91, &config), 4.0);
        assert_eq!(top.map(0.50, &config), 1.0);

        // Empty universe falls back to the direct table
        let empty = StarMapper::ByPercentile { peers: Vec::new() };
        assert_eq!(empty.map(0.95, &config), 5.0);
    }
}
