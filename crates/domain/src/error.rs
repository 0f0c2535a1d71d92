//! Error taxonomy for user-initiated actions.

use crate::entities::PoolId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kind surfaced to the UI alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Amount was zero or negative.
    InvalidAmount,
    /// Not enough free balance.
    InsufficientBalance,
    /// Not enough staked balance.
    InsufficientStake,
    /// Not enough pool share units.
    InsufficientShares,
    /// Stake is still inside its lock period.
    LockActive,
    /// No rewards or fees are claimable.
    NothingToClaim,
    /// No wallet signer is connected.
    NotConnected,
    /// The aggregator could not produce a quote.
    QuoteFetchFailed,
    /// The aggregator could not build the swap transaction.
    SwapBuildFailed,
    /// A swap did not complete.
    SwapFailed,
    /// A non-swap on-chain action did not complete.
    TransactionFailed,
    /// The referenced pool is not configured.
    UnknownPool,
    /// The persisted account store failed.
    StorageError,
}

/// Errors returned by staking, liquidity, transfer and swap actions.
///
/// The `Display` output is the short human-readable message shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("amount must be greater than zero, got {amount}")]
    InvalidAmount { amount: Decimal },

    #[error("insufficient {token} balance: need {needed}, available {available}")]
    InsufficientBalance {
        token: String,
        needed: Decimal,
        available: Decimal,
    },

    #[error("insufficient stake: requested {requested}, staked {staked}")]
    InsufficientStake { requested: Decimal, staked: Decimal },

    #[error("insufficient pool shares: requested {requested}, held {held}")]
    InsufficientShares { requested: Decimal, held: Decimal },

    #[error("stake is locked for another {remaining_secs}s")]
    LockActive { remaining_secs: i64 },

    #[error("nothing to claim")]
    NothingToClaim,

    #[error("wallet not connected")]
    NotConnected,

    #[error("quote fetch failed: {0}")]
    QuoteFetchFailed(String),

    #[error("swap transaction build failed: {0}")]
    SwapBuildFailed(String),

    #[error("swap failed: {0}")]
    SwapFailed(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("unknown pool {0}")]
    UnknownPool(PoolId),

    #[error("storage error: {0}")]
    Storage(String),
}

impl ActionError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::InsufficientStake { .. } => ErrorKind::InsufficientStake,
            Self::InsufficientShares { .. } => ErrorKind::InsufficientShares,
            Self::LockActive { .. } => ErrorKind::LockActive,
            Self::NothingToClaim => ErrorKind::NothingToClaim,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::QuoteFetchFailed(_) => ErrorKind::QuoteFetchFailed,
            Self::SwapBuildFailed(_) => ErrorKind::SwapBuildFailed,
            Self::SwapFailed(_) => ErrorKind::SwapFailed,
            Self::TransactionFailed(_) => ErrorKind::TransactionFailed,
            Self::UnknownPool(_) => ErrorKind::UnknownPool,
            Self::Storage(_) => ErrorKind::StorageError,
        }
    }

    /// Whether this error was raised by input validation, before any state change.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount { .. }
                | Self::InsufficientBalance { .. }
                | Self::InsufficientStake { .. }
                | Self::InsufficientShares { .. }
                | Self::LockActive { .. }
                | Self::NothingToClaim
                | Self::UnknownPool(_)
        )
    }

    /// Wraps this error as a swap failure, keeping the underlying reason.
    #[must_use]
    pub fn into_swap_failure(self) -> Self {
        match self {
            Self::SwapFailed(_) | Self::NotConnected => self,
            other => Self::SwapFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_and_message() {
        let err = ActionError::InsufficientBalance {
            token: "GOLD".to_string(),
            needed: dec!(10),
            available: dec!(4.5),
        };

        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(
            err.to_string(),
            "insufficient GOLD balance: need 10, available 4.5"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_swap_failure_wraps_reason() {
        let err = ActionError::SwapBuildFailed("503 from aggregator".to_string());
        let wrapped = err.into_swap_failure();

        assert_eq!(wrapped.kind(), ErrorKind::SwapFailed);
        assert!(wrapped.to_string().contains("503 from aggregator"));
        assert!(!wrapped.is_validation());
    }

    #[test]
    fn test_error_kind_serializes_camel_case() {
        let json = serde_json::to_string(&ErrorKind::LockActive).unwrap();
        assert_eq!(json, "\"lockActive\"");
    }
}
