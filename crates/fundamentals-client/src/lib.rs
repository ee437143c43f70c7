use async_trait::async_trait;
use predictability_core::{
    AnnualFundamentals, CompanyProfile, EngineError, FundamentalsProvider,
};
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

/// Sliding-window rate limiter: at most `max_requests` per `window`.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while ts
                .front()
                .map_or(false, |&t| now.duration_since(t) >= self.window)
            {
                ts.pop_front();
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let oldest = *ts.front().unwrap();
            drop(ts);
            let wait = self.window.saturating_sub(now.duration_since(oldest))
                + Duration::from_millis(50);
            tracing::debug!(
                "rate limiter: waiting {:.1}s for fundamentals API slot",
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }
    }
}

/// Async client for the fundamentals provider: annual income statements and
/// company profile metadata.
#[derive(Clone)]
pub struct FmpClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl FmpClient {
    pub fn new(api_key: String) -> Self {
        // Starter-plan default. Free tier users should set FMP_RATE_LIMIT=10.
        // Clamped to at least 1: a zero limit could never admit a request.
        let rate_limit: usize = std::env::var("FMP_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300)
            .max(1);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, EngineError> {
        let request = builder
            .build()
            .map_err(|e| EngineError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| EngineError::ApiError("cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| EngineError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 10u64;
            tracing::warn!(
                "fundamentals API 429, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(EngineError::ApiError(
            "rate limited by fundamentals API after 3 retries".to_string(),
        ))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, EngineError> {
        if !response.status().is_success() {
            return Err(EngineError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| EngineError::ApiError(e.to_string()))
    }
}

#[async_trait]
impl FundamentalsProvider for FmpClient {
    async fn annual_fundamentals(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<AnnualFundamentals>, EngineError> {
        let url = format!("{}/income-statement/{}", BASE_URL, symbol);
        let response = self
            .send_request(self.client.get(&url).query(&[
                ("period", "annual"),
                ("limit", &limit.to_string()),
                ("apikey", &self.api_key),
            ]))
            .await?;

        let statements: Vec<IncomeStatementDto> = Self::read_json(response).await?;
        tracing::debug!(
            "fetched {} annual statements for {}",
            statements.len(),
            symbol
        );

        Ok(statements
            .into_iter()
            .map(|dto| dto.into_record(symbol))
            .collect())
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, EngineError> {
        let url = format!("{}/profile/{}", BASE_URL, symbol);
        let response = self
            .send_request(self.client.get(&url).query(&[("apikey", &self.api_key)]))
            .await?;

        let profiles: Vec<ProfileDto> = Self::read_json(response).await?;
        let profile = profiles
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::ApiError(format!("no profile for {}", symbol)))?;

        Ok(CompanyProfile {
            symbol: symbol.to_string(),
            name: profile.company_name,
            currency: profile.currency,
            sector: profile.sector,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomeStatementDto {
    /// Four-digit year as a string in the provider's payload
    calendar_year: Option<String>,
    revenue: Option<f64>,
    ebitda: Option<f64>,
    operating_income: Option<f64>,
    weighted_average_shs_out_dil: Option<f64>,
}

impl IncomeStatementDto {
    fn into_record(self, symbol: &str) -> AnnualFundamentals {
        AnnualFundamentals {
            symbol: symbol.to_string(),
            fiscal_year: self
                .calendar_year
                .as_deref()
                .and_then(|y| y.parse().ok())
                .unwrap_or(0),
            revenue: self.revenue,
            ebitda: self.ebitda,
            operating_income: self.operating_income,
            diluted_shares: self.weighted_average_shs_out_dil,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDto {
    company_name: Option<String>,
    currency: Option<String>,
    sector: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_income_statement_payload_maps_to_record() {
        let payload = r#"[{
            "date": "2023-12-31",
            "calendarYear": "2023",
            "revenue": 383285000000.0,
            "ebitda": 125820000000.0,
            "operatingIncome": 114301000000.0,
            "weightedAverageShsOutDil": 15744231000.0,
            "netIncome": 96995000000.0
        }]"#;

        let statements: Vec<IncomeStatementDto> = serde_json::from_str(payload).unwrap();
        let record = statements.into_iter().next().unwrap().into_record("AAPL");

        assert_eq!(record.symbol, "AAPL");
        assert_eq!(record.fiscal_year, 2023);
        assert_eq!(record.revenue, Some(383285000000.0));
        assert_eq!(record.diluted_shares, Some(15744231000.0));
    }

    #[test]
    fn test_missing_fields_stay_none() {
        let payload = r#"[{"date": "2020-12-31", "revenue": 1000.0}]"#;
        let statements: Vec<IncomeStatementDto> = serde_json::from_str(payload).unwrap();
        let record = statements.into_iter().next().unwrap().into_record("X");

        assert_eq!(record.fiscal_year, 0);
        assert_eq!(record.ebitda, None);
        assert_eq!(record.diluted_shares, None);
    }

    #[test]
    fn test_zero_rate_limit_is_clamped_to_one() {
        std::env::set_var("FMP_RATE_LIMIT", "0");
        let client = FmpClient::new("test-key".to_string());
        std::env::remove_var("FMP_RATE_LIMIT");

        assert_eq!(client.rate_limiter.max_requests, 1);
    }

    #[test]
    fn test_profile_payload_maps_to_metadata() {
        let payload = r#"[{
            "symbol": "AAPL",
            "companyName": "Apple Inc.",
            "currency": "USD",
            "sector": "Technology"
        }]"#;

        let profiles: Vec<ProfileDto> = serde_json::from_str(payload).unwrap();
        let profile = profiles.into_iter().next().unwrap();
        assert_eq!(profile.company_name.as_deref(), Some("Apple Inc."));
        assert_eq!(profile.currency.as_deref(), Some("USD"));
    }
}
