//! # Jupiter Quote API
//!
//! Fetches quotes and converts them into [`SwapRoute`]s.

use super::JupiterClient;
use super::types::QuoteResponse;
use crate::aggregator::QuoteRequest;
use anyhow::{Context, anyhow};
use aurum_domain::entities::SwapRoute;
use aurum_domain::math::price_impact::{min_out_with_slippage, resolve_price_impact_pct};
use aurum_domain::value_objects::Amount;
use rust_decimal::Decimal;
use tracing::debug;

impl JupiterClient {
    /// Requests a quote and returns the raw JSON body.
    ///
    /// The raw body is kept so the exact quote can be posted back to `/swap`.
    pub(crate) async fn fetch_quote(&self, request: &QuoteRequest) -> anyhow::Result<serde_json::Value> {
        let amount = Amount::from_decimal(request.amount, request.input.decimals)
            .ok_or_else(|| anyhow!("amount {} not representable", request.amount))?;
        let url = format!("{}/quote", self.base_url);

        debug!(
            input = %request.input.symbol,
            output = %request.output.symbol,
            raw_amount = %amount,
            slippage_bps = request.slippage_bps,
            "Jupiter quote request"
        );

        let response = self
            .http
            .get(&url)
            .query(&[
                ("inputMint", request.input.mint_address.clone()),
                ("outputMint", request.output.mint_address.clone()),
                ("amount", amount.to_string()),
                ("slippageBps", request.slippage_bps.to_string()),
            ])
            .send()
            .await
            .context("Jupiter quote request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Jupiter quote failed ({status}): {error_text}"));
        }

        response
            .json()
            .await
            .context("Jupiter quote parse failed")
    }
}

/// Converts a raw quote body into a route in UI units.
pub fn route_from_quote(raw: serde_json::Value, request: &QuoteRequest) -> anyhow::Result<SwapRoute> {
    let quote: QuoteResponse =
        serde_json::from_value(raw.clone()).context("unexpected quote shape")?;

    let in_amount = ui_amount(&quote.in_amount, request.input.decimals)?;
    let out_amount = ui_amount(&quote.out_amount, request.output.decimals)?;
    let out_amount_with_slippage = match quote.other_amount_threshold.as_deref() {
        Some(threshold) => ui_amount(threshold, request.output.decimals)?,
        None => min_out_with_slippage(out_amount, request.slippage_bps),
    };
    let price_impact_percent = resolve_price_impact_pct(
        quote.price_impact_pct,
        in_amount,
        out_amount,
        out_amount_with_slippage,
    );
    let venues = quote
        .route_plan
        .iter()
        .map(|step| {
            step.swap_info
                .label
                .clone()
                .unwrap_or_else(|| step.swap_info.amm_key.clone())
        })
        .collect();

    debug!(
        in_amount = %in_amount,
        out_amount = %out_amount,
        price_impact = %price_impact_percent,
        "Jupiter quote"
    );

    Ok(SwapRoute {
        input_mint: quote.input_mint,
        output_mint: quote.output_mint,
        in_amount,
        out_amount,
        out_amount_with_slippage,
        price_impact_percent,
        slippage_bps: quote.slippage_bps.unwrap_or(request.slippage_bps),
        venues,
        quote: raw,
    })
}

fn ui_amount(raw: &str, decimals: u8) -> anyhow::Result<Decimal> {
    Amount::parse_raw(raw, decimals)
        .and_then(|amount| amount.to_decimal())
        .ok_or_else(|| anyhow!("invalid raw amount {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_domain::entities::Token;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn gold() -> Token {
        Token::new("GoLDmint1111111111111111111111111111111111", "GOLD", 6, "Aurum Gold")
    }

    fn request() -> QuoteRequest {
        QuoteRequest {
            input: Token::sol(),
            output: gold(),
            amount: dec!(1),
            slippage_bps: 100,
        }
    }

    fn body() -> serde_json::Value {
        json!({
            "inputMint": Token::sol().mint_address,
            "inAmount": "1000000000",
            "outputMint": gold().mint_address,
            "outAmount": "150000000",
            "otherAmountThreshold": "148500000",
            "swapMode": "ExactIn",
            "slippageBps": 100,
            "priceImpactPct": "0.12",
            "routePlan": [
                {
                    "swapInfo": {
                        "ammKey": "amm-1",
                        "label": "Orca",
                        "inputMint": Token::sol().mint_address,
                        "outputMint": "mid",
                        "inAmount": "1000000000",
                        "outAmount": "20",
                        "feeAmount": "25000",
                        "feeMint": Token::sol().mint_address
                    },
                    "percent": 100
                },
                {
                    "swapInfo": {
                        "ammKey": "amm-2",
                        "inputMint": "mid",
                        "outputMint": gold().mint_address,
                        "inAmount": "20",
                        "outAmount": "150000000"
                    },
                    "percent": 100
                }
            ],
            "contextSlot": 1
        })
    }

    #[test]
    fn test_route_from_quote() {
        let route = route_from_quote(body(), &request()).unwrap();
        assert_eq!(route.in_amount, dec!(1));
        assert_eq!(route.out_amount, dec!(150));
        assert_eq!(route.out_amount_with_slippage, dec!(148.5));
        assert_eq!(route.price_impact_percent, dec!(0.12));
        assert_eq!(route.venues, vec!["Orca".to_string(), "amm-2".to_string()]);
        // unknown fields survive for the swap request
        assert_eq!(route.quote["contextSlot"], json!(1));
    }

    #[test]
    fn test_missing_threshold_and_impact_are_derived() {
        let mut raw = body();
        raw.as_object_mut().unwrap().remove("otherAmountThreshold");
        raw.as_object_mut().unwrap().remove("priceImpactPct");
        let route = route_from_quote(raw, &request()).unwrap();
        assert_eq!(route.out_amount_with_slippage, dec!(148.5));
        assert_eq!(route.price_impact_percent, dec!(1));
    }

    #[test]
    fn test_malformed_amount_rejected() {
        let mut raw = body();
        raw["outAmount"] = json!("lots");
        assert!(route_from_quote(raw, &request()).is_err());
    }
}
