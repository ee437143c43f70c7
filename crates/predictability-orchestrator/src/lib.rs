use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use predictability_core::{FundamentalsProvider, PredictabilityResult, TimeSeriesInput};
use predictability_engine::PredictabilityEngine;

const CACHE_TTL_SECS: i64 = 300; // 5 minutes

/// Extra fiscal years requested beyond the minimum so a few unusable
/// records don't starve the validator
const FETCH_MARGIN_YEARS: usize = 5;

/// Internal cache entry with timestamp
struct CacheEntry {
    result: PredictabilityResult,
    cached_at: DateTime<Utc>,
}

/// Async surface over the pure scoring engine: fetches fundamentals once,
/// runs the pipeline, and always hands back a result — upstream fetch
/// failure becomes the same NotRatable shape the engine itself produces, so
/// the UI renders one uniform "not available" state.
pub struct PredictabilityOrchestrator<P: FundamentalsProvider> {
    provider: P,
    engine: PredictabilityEngine,
    result_cache: DashMap<String, CacheEntry>,
    cache_ttl_secs: i64,
}

impl<P: FundamentalsProvider> PredictabilityOrchestrator<P> {
    pub fn new(provider: P) -> Self {
        Self::with_engine(provider, PredictabilityEngine::new())
    }

    pub fn with_engine(provider: P, engine: PredictabilityEngine) -> Self {
        Self {
            provider,
            engine,
            result_cache: DashMap::new(),
            cache_ttl_secs: CACHE_TTL_SECS,
        }
    }

    pub fn engine(&self) -> &PredictabilityEngine {
        &self.engine
    }

    /// Score one ticker. Never fails: every error path resolves into a
    /// well-formed result.
    pub async fn calculate(&self, ticker: &str) -> PredictabilityResult {
        if let Some(hit) = self.cached(ticker) {
            tracing::debug!("predictability cache hit for {}", ticker);
            return hit;
        }

        let result = self.fetch_and_score(ticker, None).await;
        self.result_cache.insert(
            ticker.to_string(),
            CacheEntry {
                result: result.clone(),
                cached_at: Utc::now(),
            },
        );
        result
    }

    /// Score one ticker with percentile mapping against a caller-supplied
    /// universe of peer composite scores. Not cached: the universe varies
    /// per call.
    pub async fn calculate_with_peers(
        &self,
        ticker: &str,
        peer_scores: Vec<f64>,
    ) -> PredictabilityResult {
        self.fetch_and_score(ticker, Some(peer_scores)).await
    }

    /// Score several tickers concurrently. Each invocation owns its input
    /// and intermediates exclusively; results come back in request order.
    pub async fn calculate_many(&self, tickers: &[String]) -> Vec<PredictabilityResult> {
        join_all(tickers.iter().map(|t| self.calculate(t))).await
    }

    async fn fetch_and_score(
        &self,
        ticker: &str,
        peer_scores: Option<Vec<f64>>,
    ) -> PredictabilityResult {
        let fetch_years = self.engine.config().minimum_years + FETCH_MARGIN_YEARS;
        let (fundamentals, profile) = tokio::join!(
            self.provider.annual_fundamentals(ticker, fetch_years),
            self.provider.company_profile(ticker),
        );

        let records = match fundamentals {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("fundamentals fetch failed for {}: {}", ticker, e);
                return PredictabilityResult::not_ratable(
                    ticker,
                    None,
                    format!("fundamentals fetch failed: {}", e),
                    0,
                );
            }
        };

        let input = TimeSeriesInput::from_annual_records(ticker, &records);
        let mut result = match peer_scores {
            Some(peers) => self.engine.score_with_peers(&input, peers),
            None => self.engine.score(&input),
        };

        // Profile is labeling only; a failed profile fetch degrades quietly
        match profile {
            Ok(profile) => {
                result.currency = profile.currency;
                result.sector = profile.sector;
            }
            Err(e) => tracing::debug!("profile fetch failed for {}: {}", ticker, e),
        }

        tracing::info!(
            "scored {}: {} ({} years)",
            ticker,
            result.rating.label(),
            result.data_window_years
        );
        result
    }

    fn cached(&self, ticker: &str) -> Option<PredictabilityResult> {
        let entry = self.result_cache.get(ticker)?;
        let age = Utc::now().signed_duration_since(entry.cached_at);
        if age.num_seconds() < self.cache_ttl_secs {
            Some(entry.result.clone())
        } else {
            None
        }
    }
}
