use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One annual fundamentals record from the market-data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualFundamentals {
    pub symbol: String,
    pub fiscal_year: i32,
    pub revenue: Option<f64>,
    pub ebitda: Option<f64>,
    pub operating_income: Option<f64>,
    /// Diluted weighted-average shares outstanding
    pub diluted_shares: Option<f64>,
}

/// Company profile metadata, used for display labeling only
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: Option<String>,
    pub currency: Option<String>,
    pub sector: Option<String>,
}

/// The engine's sole input: aligned annual series, oldest year first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesInput {
    pub ticker: String,
    pub years: Vec<i32>,
    pub revenue_per_share: Vec<f64>,
    pub ebitda_per_share: Vec<f64>,
    pub operating_income: Vec<f64>,
}

impl TimeSeriesInput {
    /// Build an input from raw annual records. Records missing any of the
    /// four required fields, or with non-positive share counts, are skipped;
    /// the remainder is sorted oldest first. The validator stage reports the
    /// usable count, so a short result here is not an error.
    pub fn from_annual_records(ticker: &str, records: &[AnnualFundamentals]) -> Self {
        let mut usable: Vec<(i32, f64, f64, f64)> = records
            .iter()
            .filter_map(|r| {
                let shares = r.diluted_shares?;
                if shares <= 0.0 {
                    return None;
                }
                Some((
                    r.fiscal_year,
                    r.revenue? / shares,
                    r.ebitda? / shares,
                    r.operating_income?,
                ))
            })
            .collect();
        usable.sort_by_key(|&(year, ..)| year);

        let mut input = TimeSeriesInput {
            ticker: ticker.to_string(),
            years: Vec::with_capacity(usable.len()),
            revenue_per_share: Vec::with_capacity(usable.len()),
            ebitda_per_share: Vec::with_capacity(usable.len()),
            operating_income: Vec::with_capacity(usable.len()),
        };
        for (year, rps, eps, oi) in usable {
            input.years.push(year);
            input.revenue_per_share.push(rps);
            input.ebitda_per_share.push(eps);
            input.operating_income.push(oi);
        }
        input
    }

    /// Number of annual data points
    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// All four sequences share the same length
    pub fn is_aligned(&self) -> bool {
        let n = self.years.len();
        self.revenue_per_share.len() == n
            && self.ebitda_per_share.len() == n
            && self.operating_income.len() == n
    }
}

/// Log-linear trend fit for one series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResult {
    pub r_squared: f64,
    /// Root mean squared residual, in log space
    pub rmse: f64,
    pub residuals: Vec<f64>,
    pub slope: f64,
    pub intercept: f64,
}

impl RegressionResult {
    /// Zero-information result for series with fewer than 3 usable points
    pub fn degenerate() -> Self {
        Self {
            r_squared: 0.0,
            rmse: f64::INFINITY,
            residuals: Vec::new(),
            slope: 0.0,
            intercept: 0.0,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.residuals.is_empty()
    }
}

/// Year-over-year growth dispersion for one series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthProfile {
    /// Winsorized period-over-period growth rates
    pub rates: Vec<f64>,
    /// Population standard deviation of the winsorized rates
    pub sigma: f64,
    pub has_outliers: bool,
}

impl GrowthProfile {
    pub fn empty() -> Self {
        Self {
            rates: Vec::new(),
            sigma: 0.0,
            has_outliers: false,
        }
    }
}

/// Midpoint regime-change test for one series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakTestResult {
    pub has_break: bool,
    pub break_year_index: Option<usize>,
    /// Indicative confidence, not an exact p-value
    pub confidence: f64,
}

impl BreakTestResult {
    pub fn none() -> Self {
        Self {
            has_break: false,
            break_year_index: None,
            confidence: 0.0,
        }
    }
}

/// All per-series sub-scores, bundled for the scorer and the debug panel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDiagnostics {
    pub regression: RegressionResult,
    pub growth: GrowthProfile,
    pub break_test: BreakTestResult,
}

/// Blended score with its components and penalties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeScore {
    pub trend_component: f64,
    pub smoothness_component: f64,
    pub residual_component: f64,
    pub outlier_penalty: f64,
    pub break_penalty: f64,
    pub raw: f64,
    #[serde(rename = "final")]
    pub final_score: f64,
}

/// Star rating on the 1.0–5.0 half-star scale, or Not Ratable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PredictabilityRating {
    Stars(f64),
    NotRatable,
}

impl PredictabilityRating {
    pub fn label(&self) -> String {
        match self {
            PredictabilityRating::Stars(stars) => format!("{:.1}", stars),
            PredictabilityRating::NotRatable => "NR".to_string(),
        }
    }

    pub fn stars(&self) -> Option<f64> {
        match self {
            PredictabilityRating::Stars(stars) => Some(*stars),
            PredictabilityRating::NotRatable => None,
        }
    }
}

/// Why the pipeline stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisqualificationReason {
    InsufficientData,
    OperatingLoss,
    InvalidSeriesValues,
}

impl DisqualificationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisqualificationReason::InsufficientData => "insufficient_data",
            DisqualificationReason::OperatingLoss => "operating_loss",
            DisqualificationReason::InvalidSeriesValues => "invalid_series_values",
        }
    }
}

/// Advisory reason codes from the recent-window watch checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchReason {
    ResidualSpike,
    VarianceJump,
}

impl WatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchReason::ResidualSpike => "residual_spike",
            WatchReason::VarianceJump => "variance_jump",
        }
    }
}

/// Non-blocking early-warning flag; never changes the rating
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchStatus {
    pub flagged: bool,
    pub reasons: Vec<WatchReason>,
}

/// Final output of one scoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictabilityResult {
    pub ticker: String,
    pub rating: PredictabilityRating,
    pub composite: Option<CompositeScore>,
    pub revenue: Option<SeriesDiagnostics>,
    pub ebitda: Option<SeriesDiagnostics>,
    pub flag: Option<DisqualificationReason>,
    pub watch: WatchStatus,
    pub explanation: String,
    pub data_window_years: usize,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    pub computed_at: DateTime<Utc>,
}

impl PredictabilityResult {
    /// Uniform "could not score" shape used for both engine disqualification
    /// and upstream fetch failure
    pub fn not_ratable(
        ticker: &str,
        flag: Option<DisqualificationReason>,
        explanation: String,
        data_window_years: usize,
    ) -> Self {
        Self {
            ticker: ticker.to_string(),
            rating: PredictabilityRating::NotRatable,
            composite: None,
            revenue: None,
            ebitda: None,
            flag,
            watch: WatchStatus::default(),
            explanation,
            data_window_years,
            currency: None,
            sector: None,
            computed_at: Utc::now(),
        }
    }

    /// Floor-rated terminal result for loss years or non-positive values
    pub fn floor_rated(
        ticker: &str,
        floor_stars: f64,
        flag: DisqualificationReason,
        explanation: String,
        data_window_years: usize,
    ) -> Self {
        Self {
            ticker: ticker.to_string(),
            rating: PredictabilityRating::Stars(floor_stars),
            composite: None,
            revenue: None,
            ebitda: None,
            flag: Some(flag),
            watch: WatchStatus::default(),
            explanation,
            data_window_years,
            currency: None,
            sector: None,
            computed_at: Utc::now(),
        }
    }
}
