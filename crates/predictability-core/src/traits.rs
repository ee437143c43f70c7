use crate::{AnnualFundamentals, CompanyProfile, EngineError};
use async_trait::async_trait;

/// Trait for annual fundamentals sources. The orchestrator is generic over
/// this so tests can substitute a mock provider.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Annual statements for a symbol, up to `limit` fiscal years.
    /// Ordering is provider-defined; callers sort before use.
    async fn annual_fundamentals(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<AnnualFundamentals>, EngineError>;

    /// Company profile metadata (currency, sector) for labeling
    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, EngineError>;
}
