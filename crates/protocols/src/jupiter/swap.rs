//! # Jupiter Swap Transaction Building
//!
//! Swap transaction building from Jupiter quotes.

use super::JupiterClient;
use super::types::SwapTransactionResponse;
use anyhow::{Context, anyhow};
use tracing::debug;

impl JupiterClient {
    /// Build an unsigned swap transaction from a raw quote body.
    pub(crate) async fn build_swap_transaction(
        &self,
        quote_response: &serde_json::Value,
        user_public_key: &str,
    ) -> anyhow::Result<SwapTransactionResponse> {
        let url = format!("{}/swap", self.base_url);

        let request_body = serde_json::json!({
            "quoteResponse": quote_response,
            "userPublicKey": user_public_key,
            "wrapAndUnwrapSol": true,
            "dynamicComputeUnitLimit": true,
            "prioritizationFeeLamports": "auto",
        });

        debug!(user = %user_public_key, "Jupiter swap transaction request");

        let response = self
            .http
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .context("Jupiter swap request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Jupiter swap transaction failed ({status}): {error_text}"));
        }

        let swap_response: SwapTransactionResponse = response
            .json()
            .await
            .context("Jupiter swap response parse failed")?;

        debug!(
            last_valid_block_height = swap_response.last_valid_block_height,
            "Jupiter swap transaction received"
        );

        Ok(swap_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_response_parses() {
        let body = r#"{"swapTransaction":"AQID","lastValidBlockHeight":279632475,"prioritizationFeeLamports":9999}"#;
        let parsed: SwapTransactionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.swap_transaction, "AQID");
        assert_eq!(parsed.last_valid_block_height, 279_632_475);
        assert_eq!(parsed.prioritization_fee_lamports, Some(9999));
    }
}
