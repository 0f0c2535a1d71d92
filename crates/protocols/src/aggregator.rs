use crate::signer::UnsignedTransaction;
use async_trait::async_trait;
use aurum_domain::entities::{SwapRoute, Token};
use aurum_domain::error::ActionError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors reported by a quote aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    #[error("quote fetch failed: {0}")]
    QuoteFetch(String),
    #[error("swap build failed: {0}")]
    SwapBuild(String),
}

impl From<AggregatorError> for ActionError {
    fn from(err: AggregatorError) -> Self {
        match err {
            AggregatorError::QuoteFetch(reason) => ActionError::QuoteFetchFailed(reason),
            AggregatorError::SwapBuild(reason) => ActionError::SwapBuildFailed(reason),
        }
    }
}

/// A quote request in UI units.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub input: Token,
    pub output: Token,
    pub amount: Decimal,
    pub slippage_bps: u16,
}

/// Source of swap routes and swap transactions.
#[async_trait]
pub trait QuoteAggregator: Send + Sync {
    /// Candidate routes for the request, best first.
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Vec<SwapRoute>, AggregatorError>;

    /// Serialized transaction executing exactly `route` for `user`.
    async fn get_swap_transaction(
        &self,
        route: &SwapRoute,
        user: &str,
    ) -> Result<UnsignedTransaction, AggregatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_domain::error::ErrorKind;

    #[test]
    fn test_error_kinds() {
        let fetch: ActionError = AggregatorError::QuoteFetch("timeout".into()).into();
        assert_eq!(fetch.kind(), ErrorKind::QuoteFetchFailed);
        let build: ActionError = AggregatorError::SwapBuild("stale quote".into()).into();
        assert_eq!(build.kind(), ErrorKind::SwapBuildFailed);
    }
}
