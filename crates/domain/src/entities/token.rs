use serde::{Deserialize, Serialize};

/// A fungible token known to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub mint_address: String,
    pub symbol: String,
    pub decimals: u8,
    pub name: String,
}

impl Token {
    pub fn new(
        mint: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        name: impl Into<String>,
    ) -> Self {
        Self {
            mint_address: mint.into(),
            symbol: symbol.into(),
            decimals,
            name: name.into(),
        }
    }

    /// Wrapped SOL.
    pub fn sol() -> Self {
        Self::new(
            "So11111111111111111111111111111111111111112",
            "SOL",
            9,
            "Solana",
        )
    }

    /// USD Coin.
    pub fn usdc() -> Self {
        Self::new(
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "USDC",
            6,
            "USD Coin",
        )
    }
}
