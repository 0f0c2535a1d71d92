use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a staking or liquidity pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(String);

impl PoolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoolId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Pool-wide liquidity accounting.
///
/// `reserve_a` is denominated in `base_token`, the token holders deposit.
/// `fee_per_share` is a running accumulator of fees owed per share unit;
/// it only moves forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolState {
    pub pool: PoolId,
    pub base_token: String,
    pub quote_token: String,
    pub total_share_units: Decimal,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    /// Fees distributed to liquidity providers per day, in base token.
    pub daily_fee_emission: Decimal,
    pub fee_per_share: Decimal,
    pub last_accrual: Option<DateTime<Utc>>,
}

impl PoolState {
    pub fn new(
        pool: PoolId,
        base_token: impl Into<String>,
        quote_token: impl Into<String>,
        reserve_b: Decimal,
        daily_fee_emission: Decimal,
    ) -> Self {
        Self {
            pool,
            base_token: base_token.into(),
            quote_token: quote_token.into(),
            total_share_units: Decimal::ZERO,
            reserve_a: Decimal::ZERO,
            reserve_b,
            daily_fee_emission,
            fee_per_share: Decimal::ZERO,
            last_accrual: None,
        }
    }
}

/// A holder's share of one liquidity pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolShare {
    pub share_units: Decimal,
    /// Value of the pool's `fee_per_share` when `accrued_fees` was last settled.
    pub fee_checkpoint: Decimal,
    /// Settled, unclaimed fees in base token.
    pub accrued_fees: Decimal,
}

/// Periodically refreshed, read-only aggregate view of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool: PoolId,
    pub tvl: Decimal,
    pub volume_24h: Decimal,
    pub fees_24h: Decimal,
    pub apy: Decimal,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    pub taken_at: DateTime<Utc>,
}

/// A holder's position in a pool, for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolPosition {
    pub share_units: Decimal,
    /// Fraction of the pool owned, between 0 and 1.
    pub percentage: Decimal,
    /// `percentage × tvl`, absent until a snapshot exists.
    pub value: Option<Decimal>,
    pub pending_fees: Decimal,
}
