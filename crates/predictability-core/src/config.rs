use serde::{Deserialize, Serialize};

/// All thresholds and mapping tables for one scoring run. Passed into the
/// pipeline as a value so tests can override any knob deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum annual data points required to rate at all
    pub minimum_years: usize,
    /// Growth rates are capped to ±winsor_bound before dispersion math
    pub winsor_bound: f64,
    /// Post-winsorization |z| beyond this flags a growth outlier
    pub outlier_z_threshold: f64,

    /// Break test is skipped entirely below this series length
    pub break_min_points: usize,
    /// Half-vs-half R² difference that flags a break
    pub break_r_squared_gap: f64,
    /// Half-vs-half log-slope difference that flags a break
    pub break_slope_gap: f64,
    /// Full-series R² above this counts as a strong global fit
    pub break_strong_full_fit: f64,
    /// Half-series R² below this counts as a weak half fit
    pub break_weak_half_fit: f64,
    /// Indicative confidence attached when a break fires
    pub break_confidence: f64,

    /// Component weights; expected to sum to 1.0
    pub trend_weight: f64,
    pub smoothness_weight: f64,
    pub residual_weight: f64,
    pub outlier_penalty: f64,
    pub break_penalty: f64,

    /// Fallback normalization scales when no peer range is supplied:
    /// sigma (rmse) at or above the scale maps to a zero component
    pub sigma_scale: f64,
    pub rmse_scale: f64,
    /// Peer-universe min/max overrides for the fallback scales
    pub peer_sigma_range: Option<(f64, f64)>,
    pub peer_rmse_range: Option<(f64, f64)>,

    /// Recent-vs-historical |residual| ratio that trips the watch flag
    pub watch_residual_ratio: f64,
    /// Recent-vs-historical sigma ratio that trips the watch flag
    pub watch_sigma_ratio: f64,
    /// Number of most recent growth intervals in the watch window
    pub watch_recent_intervals: usize,

    pub floor_stars: f64,
    /// Descending (stars, minimum percentile rank) bands; the floor star is
    /// the catch-all below the last band
    pub percentile_bands: Vec<(f64, f64)>,
    /// Descending (stars, minimum composite score) bands, same shape
    pub score_bands: Vec<(f64, f64)>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            minimum_years: 10,
            winsor_bound: 2.0,
            outlier_z_threshold: 3.0,

            break_min_points: 8,
            break_r_squared_gap: 0.3,
            // ln-space gap; 0.25 registers a 5%→40% compound-growth shift
            break_slope_gap: 0.25,
            break_strong_full_fit: 0.7,
            break_weak_half_fit: 0.4,
            break_confidence: 0.8,

            trend_weight: 0.40,
            smoothness_weight: 0.35,
            residual_weight: 0.25,
            outlier_penalty: 0.10,
            break_penalty: 0.20,

            sigma_scale: 0.5,
            rmse_scale: 0.5,
            peer_sigma_range: None,
            peer_rmse_range: None,

            watch_residual_ratio: 2.0,
            watch_sigma_ratio: 1.5,
            watch_recent_intervals: 3,

            floor_stars: 1.0,
            percentile_bands: vec![
                (5.0, 0.967),
                (4.5, 0.933),
                (4.0, 0.900),
                (3.5, 0.866),
                (3.0, 0.832),
                (2.5, 0.799),
                (2.0, 0.782),
                (1.5, 0.765),
            ],
            score_bands: vec![
                (5.0, 0.90),
                (4.5, 0.80),
                (4.0, 0.70),
                (3.5, 0.60),
                (3.0, 0.50),
                (2.5, 0.40),
                (2.0, 0.30),
                (1.5, 0.20),
            ],
        }
    }
}
