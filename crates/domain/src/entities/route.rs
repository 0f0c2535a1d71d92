use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One candidate swap route returned by the quote aggregator.
///
/// Amounts are in UI units (decimals applied). `quote` keeps the aggregator's
/// original payload so the exact route can be handed back when building the
/// swap transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: Decimal,
    pub out_amount: Decimal,
    /// Minimum output after slippage tolerance.
    pub out_amount_with_slippage: Decimal,
    pub price_impact_percent: Decimal,
    pub slippage_bps: u16,
    /// DEX labels the route passes through, in order.
    pub venues: Vec<String>,
    pub quote: serde_json::Value,
}

impl SwapRoute {
    /// Output per unit of input, zero for an empty input.
    pub fn execution_rate(&self) -> Decimal {
        if self.in_amount.is_zero() {
            return Decimal::ZERO;
        }
        self.out_amount / self.in_amount
    }

    /// Human-readable venue path, e.g. `"Orca → Raydium"`.
    pub fn venue_path(&self) -> String {
        if self.venues.is_empty() {
            return "Unknown".to_string();
        }
        self.venues.join(" → ")
    }
}
