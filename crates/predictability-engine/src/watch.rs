use crate::volatility::analyze_growth;
use predictability_core::{ScoringConfig, SeriesDiagnostics, WatchReason, WatchStatus};

/// Log-space dispersion below this is rounding noise from an exact fit,
/// not deterioration worth watching
const MATERIALITY_FLOOR: f64 = 1e-9;

/// Inspect only the most recent data for deterioration the full-window score
/// has not caught yet. Advisory: the output never changes the rating.
pub fn evaluate_watch(
    revenue_series: &[f64],
    revenue: &SeriesDiagnostics,
    ebitda_series: &[f64],
    ebitda: &SeriesDiagnostics,
    config: &ScoringConfig,
) -> WatchStatus {
    let mut reasons = Vec::new();

    if residual_spike(&revenue.regression.residuals, config)
        || residual_spike(&ebitda.regression.residuals, config)
    {
        reasons.push(WatchReason::ResidualSpike);
    }

    if variance_jump(revenue_series, revenue.growth.sigma, config)
        || variance_jump(ebitda_series, ebitda.growth.sigma, config)
    {
        reasons.push(WatchReason::VarianceJump);
    }

    WatchStatus {
        flagged: !reasons.is_empty(),
        reasons,
    }
}

/// Average |residual| over the last min(2, N) points vs. the full series
fn residual_spike(residuals: &[f64], config: &ScoringConfig) -> bool {
    if residuals.is_empty() {
        return false;
    }
    let full_avg = residuals.iter().map(|r| r.abs()).sum::<f64>() / residuals.len() as f64;
    if full_avg <= MATERIALITY_FLOOR {
        return false;
    }
    let recent = &residuals[residuals.len() - residuals.len().min(2)..];
    let recent_avg = recent.iter().map(|r| r.abs()).sum::<f64>() / recent.len() as f64;
    recent_avg > config.watch_residual_ratio * full_avg
}

/// Growth-rate sigma over the short recent window vs. the full history
fn variance_jump(series: &[f64], full_sigma: f64, config: &ScoringConfig) -> bool {
    if full_sigma <= MATERIALITY_FLOOR || series.len() < config.watch_recent_intervals + 1 {
        return false;
    }
    let tail = &series[series.len() - (config.watch_recent_intervals + 1)..];
    let recent = analyze_growth(tail, config.winsor_bound, config.outlier_z_threshold);
    recent.sigma > config.watch_sigma_ratio * full_sigma
}
