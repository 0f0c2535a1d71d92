//! # Jupiter API Types
//!
//! Wire types for the Jupiter v6 quote and swap endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Response from the quote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    #[serde(rename = "inputMint")]
    pub input_mint: String,
    #[serde(rename = "outputMint")]
    pub output_mint: String,
    #[serde(rename = "inAmount")]
    pub in_amount: String,
    #[serde(rename = "outAmount")]
    pub out_amount: String,
    /// Minimum output after slippage, in raw units.
    #[serde(rename = "otherAmountThreshold", default)]
    pub other_amount_threshold: Option<String>,
    #[serde(rename = "slippageBps", default)]
    pub slippage_bps: Option<u16>,
    /// Price impact in percent; Jupiter sends it as a string.
    #[serde(rename = "priceImpactPct", default)]
    pub price_impact_pct: Option<Decimal>,
    #[serde(rename = "routePlan", default)]
    pub route_plan: Vec<RoutePlanStep>,
}

/// A step in Jupiter's routing plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlanStep {
    #[serde(rename = "swapInfo")]
    pub swap_info: SwapInfo,
    #[serde(default)]
    pub percent: Option<u8>,
}

/// Details about a single swap operation within a route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapInfo {
    #[serde(rename = "ammKey")]
    pub amm_key: String,
    pub label: Option<String>,
    #[serde(rename = "inputMint")]
    pub input_mint: String,
    #[serde(rename = "outputMint")]
    pub output_mint: String,
    #[serde(rename = "inAmount")]
    pub in_amount: String,
    #[serde(rename = "outAmount")]
    pub out_amount: String,
    #[serde(rename = "feeAmount", default)]
    pub fee_amount: Option<String>,
    #[serde(rename = "feeMint", default)]
    pub fee_mint: Option<String>,
}

/// Response from the swap endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapTransactionResponse {
    /// Base64-encoded serialized transaction
    #[serde(rename = "swapTransaction")]
    pub swap_transaction: String,
    /// Block height after which transaction is invalid
    #[serde(rename = "lastValidBlockHeight")]
    pub last_valid_block_height: u64,
    #[serde(rename = "prioritizationFeeLamports", default)]
    pub prioritization_fee_lamports: Option<u64>,
}
