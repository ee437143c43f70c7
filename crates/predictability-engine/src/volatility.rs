use predictability_core::GrowthProfile;
use statrs::statistics::Statistics;

/// Compute the year-over-year growth profile of a series.
///
/// Rates are taken for each consecutive pair with a positive prior value and
/// winsorized to ±`winsor_bound` before any dispersion math, so a one-off
/// swing cannot dominate sigma. Outliers are re-checked after winsorization
/// against the capped rates' own mean and sigma.
pub fn analyze_growth(series: &[f64], winsor_bound: f64, z_threshold: f64) -> GrowthProfile {
    if series.len() < 2 {
        return GrowthProfile::empty();
    }

    let rates: Vec<f64> = series
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] / w[0] - 1.0).clamp(-winsor_bound, winsor_bound))
        .collect();

    if rates.is_empty() {
        return GrowthProfile::empty();
    }

    let mean = rates.as_slice().mean();
    let sigma = rates.as_slice().population_std_dev();
    // Sigma at float-noise scale carries no outlier signal
    let has_outliers =
        sigma > f64::EPSILON && rates.iter().any(|&r| ((r - mean) / sigma).abs() > z_threshold);

    GrowthProfile {
        rates,
        sigma,
        has_outliers,
    }
}
