use crate::scoring::{composite_score, StarMapper};
use crate::{breaks, regression, volatility, watch};
use chrono::Utc;
use predictability_core::{
    CompositeScore, DisqualificationReason, PredictabilityRating, PredictabilityResult,
    ScoringConfig, SeriesDiagnostics, TimeSeriesInput, WatchStatus,
};

/// Outcome of an early pipeline stage: either carry the validated input
/// forward or stop with a finished result. Threaded explicitly so every
/// short-circuit is a value, not control flow.
enum StageOutcome<'a> {
    Continue(&'a TimeSeriesInput),
    Terminal(Box<PredictabilityResult>),
}

/// The full scoring pipeline. Pure and synchronous; always returns a
/// well-formed result in time proportional to the series length.
pub struct PredictabilityEngine {
    config: ScoringConfig,
}

impl PredictabilityEngine {
    pub fn new() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a ticker's history with the direct score-to-star table
    pub fn score(&self, input: &TimeSeriesInput) -> PredictabilityResult {
        self.score_with_mapper(input, &StarMapper::ByScore)
    }

    /// Score with percentile ranking against a peer universe of composite
    /// scores
    pub fn score_with_peers(
        &self,
        input: &TimeSeriesInput,
        peers: Vec<f64>,
    ) -> PredictabilityResult {
        self.score_with_mapper(input, &StarMapper::ByPercentile { peers })
    }

    pub fn score_with_mapper(
        &self,
        input: &TimeSeriesInput,
        mapper: &StarMapper,
    ) -> PredictabilityResult {
        let outcome = self.validate(input);
        let outcome = match outcome {
            StageOutcome::Continue(input) => self.screen_losses(input),
            terminal => terminal,
        };
        match outcome {
            StageOutcome::Terminal(result) => *result,
            StageOutcome::Continue(input) => self.run_analysis(input, mapper),
        }
    }

    /// Stage 1: minimum history length and shape
    fn validate<'a>(&self, input: &'a TimeSeriesInput) -> StageOutcome<'a> {
        if !input.is_aligned() {
            return StageOutcome::Terminal(Box::new(PredictabilityResult::not_ratable(
                &input.ticker,
                None,
                "input series are misaligned".to_string(),
                input.len(),
            )));
        }
        if input.len() < self.config.minimum_years {
            return StageOutcome::Terminal(Box::new(PredictabilityResult::not_ratable(
                &input.ticker,
                Some(DisqualificationReason::InsufficientData),
                format!(
                    "only {} of {} required years of data",
                    input.len(),
                    self.config.minimum_years
                ),
                input.len(),
            )));
        }
        StageOutcome::Continue(input)
    }

    /// Stage 2: operating losses and non-positive per-share values are a
    /// hard floor, not a penalty
    fn screen_losses<'a>(&self, input: &'a TimeSeriesInput) -> StageOutcome<'a> {
        if input.operating_income.iter().any(|&oi| oi < 0.0) {
            return StageOutcome::Terminal(Box::new(PredictabilityResult::floor_rated(
                &input.ticker,
                self.config.floor_stars,
                DisqualificationReason::OperatingLoss,
                "at least one operating-loss year detected".to_string(),
                input.len(),
            )));
        }
        let non_positive = input
            .revenue_per_share
            .iter()
            .chain(input.ebitda_per_share.iter())
            .any(|&v| v <= 0.0);
        if non_positive {
            return StageOutcome::Terminal(Box::new(PredictabilityResult::floor_rated(
                &input.ticker,
                self.config.floor_stars,
                DisqualificationReason::InvalidSeriesValues,
                "non-positive per-share values present".to_string(),
                input.len(),
            )));
        }
        StageOutcome::Continue(input)
    }

    /// Stages 3–9: regressions, volatility, break tests, composite score,
    /// category mapping, watch checks, assembly
    fn run_analysis(&self, input: &TimeSeriesInput, mapper: &StarMapper) -> PredictabilityResult {
        let revenue = self.analyze_series(&input.revenue_per_share);
        let ebitda = self.analyze_series(&input.ebitda_per_share);

        let composite = composite_score(&revenue, &ebitda, &self.config);
        let stars = mapper.map(composite.final_score, &self.config);
        let watch = watch::evaluate_watch(
            &input.revenue_per_share,
            &revenue,
            &input.ebitda_per_share,
            &ebitda,
            &self.config,
        );
        let explanation = build_explanation(stars, &revenue, &ebitda, &composite, &watch);

        PredictabilityResult {
            ticker: input.ticker.clone(),
            rating: PredictabilityRating::Stars(stars),
            composite: Some(composite),
            revenue: Some(revenue),
            ebitda: Some(ebitda),
            flag: None,
            watch,
            explanation,
            data_window_years: input.len(),
            currency: None,
            sector: None,
            computed_at: Utc::now(),
        }
    }

    fn analyze_series(&self, series: &[f64]) -> SeriesDiagnostics {
        SeriesDiagnostics {
            regression: regression::fit_log_linear(series),
            growth: volatility::analyze_growth(
                series,
                self.config.winsor_bound,
                self.config.outlier_z_threshold,
            ),
            break_test: breaks::test_structural_break(series, &self.config),
        }
    }
}

impl Default for PredictabilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn build_explanation(
    stars: f64,
    revenue: &SeriesDiagnostics,
    ebitda: &SeriesDiagnostics,
    composite: &CompositeScore,
    watch: &WatchStatus,
) -> String {
    let mut parts = vec![format!(
        "{:.1}-star predictability: trend R² {:.2} (revenue) / {:.2} (EBITDA), growth σ {:.2}, composite {:.2}",
        stars,
        revenue.regression.r_squared,
        ebitda.regression.r_squared,
        revenue.growth.sigma.max(ebitda.growth.sigma),
        composite.final_score,
    )];
    if composite.outlier_penalty > 0.0 {
        parts.push("growth outlier penalty applied".to_string());
    }
    if composite.break_penalty > 0.0 {
        parts.push("structural break penalty applied".to_string());
    }
    if watch.flagged {
        let reasons: Vec<&str> = watch.reasons.iter().map(|r| r.as_str()).collect();
        parts.push(format!("watch: {}", reasons.join(", ")));
    }
    parts.join("; ")
}
