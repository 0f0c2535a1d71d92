//! # Jupiter Aggregator Client
//!
//! [`QuoteAggregator`] backed by the Jupiter v6 HTTP API.

pub mod quote;
pub mod swap;
pub mod types;

use crate::aggregator::{AggregatorError, QuoteAggregator, QuoteRequest};
use crate::signer::UnsignedTransaction;
use async_trait::async_trait;
use aurum_domain::entities::SwapRoute;
use std::time::Duration;
use tracing::warn;

pub use quote::route_from_quote;
pub use types::*;

/// Default Jupiter quote API base URL.
pub const DEFAULT_BASE_URL: &str = "https://quote-api.jup.ag/v6";

/// Builder for configuring a [`JupiterClient`].
#[derive(Debug, Clone)]
pub struct JupiterClientBuilder {
    timeout: Duration,
    base_url: String,
}

impl Default for JupiterClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl JupiterClientBuilder {
    /// Set the HTTP request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the client.
    pub fn build(self) -> anyhow::Result<JupiterClient> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(JupiterClient {
            http,
            base_url: self.base_url,
        })
    }
}

/// Client for the Jupiter Aggregator API.
#[derive(Debug, Clone)]
pub struct JupiterClient {
    http: reqwest::Client,
    base_url: String,
}

impl JupiterClient {
    /// Creates a new client against `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    pub fn builder() -> JupiterClientBuilder {
        JupiterClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl QuoteAggregator for JupiterClient {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Vec<SwapRoute>, AggregatorError> {
        let raw = self.fetch_quote(request).await.map_err(|e| {
            warn!(error = %e, "Jupiter quote failed");
            AggregatorError::QuoteFetch(format!("{e:#}"))
        })?;
        let route = route_from_quote(raw, request)
            .map_err(|e| AggregatorError::QuoteFetch(format!("{e:#}")))?;
        Ok(vec![route])
    }

    async fn get_swap_transaction(
        &self,
        route: &SwapRoute,
        user: &str,
    ) -> Result<UnsignedTransaction, AggregatorError> {
        let response = self
            .build_swap_transaction(&route.quote, user)
            .await
            .map_err(|e| AggregatorError::SwapBuild(format!("{e:#}")))?;
        Ok(UnsignedTransaction::Serialized {
            payload: response.swap_transaction,
            last_valid_block_height: Some(response.last_valid_block_height),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = JupiterClient::builder()
            .base_url("http://localhost:8080/v6/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/v6");
    }
}
