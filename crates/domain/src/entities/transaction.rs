use crate::entities::HolderId;
use crate::error::{ActionError, ErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Kind of user-initiated on-chain action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxKind {
    Send,
    Swap,
    Stake,
    Unstake,
    Claim,
    AddLiquidity,
    RemoveLiquidity,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Send => "send",
            Self::Swap => "swap",
            Self::Stake => "stake",
            Self::Unstake => "unstake",
            Self::Claim => "claim",
            Self::AddLiquidity => "add liquidity",
            Self::RemoveLiquidity => "remove liquidity",
        };
        f.write_str(label)
    }
}

/// Status of a transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Attempted to move a record out of a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transaction {id} is already {status:?}")]
pub struct TransitionError {
    pub id: Uuid,
    pub status: TxStatus,
}

/// Tracked representation of one user-initiated on-chain action.
///
/// Created `Pending`, then moved exactly once to `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub kind: TxKind,
    pub holder: HolderId,
    pub status: TxStatus,
    pub timestamp: DateTime<Utc>,
    /// Short description, e.g. `"stake 400 GOLD"`.
    pub summary: String,
    pub chain_signature: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl TransactionRecord {
    pub fn new(
        kind: TxKind,
        holder: HolderId,
        summary: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            holder,
            status: TxStatus::Pending,
            timestamp: now,
            summary: summary.into(),
            chain_signature: None,
            error: None,
            error_kind: None,
        }
    }

    /// Marks the record completed with the chain signature.
    ///
    /// # Errors
    /// Returns `TransitionError` if the record is already terminal.
    pub fn complete(&mut self, signature: impl Into<String>) -> Result<(), TransitionError> {
        self.ensure_pending()?;
        self.status = TxStatus::Completed;
        self.chain_signature = Some(signature.into());
        Ok(())
    }

    /// Marks the record failed with the error's message and kind.
    ///
    /// # Errors
    /// Returns `TransitionError` if the record is already terminal.
    pub fn fail(&mut self, error: &ActionError) -> Result<(), TransitionError> {
        self.ensure_pending()?;
        self.status = TxStatus::Failed;
        self.error = Some(error.to_string());
        self.error_kind = Some(error.kind());
        Ok(())
    }

    /// Attaches a signature observed before the final status is known.
    pub fn attach_signature(&mut self, signature: impl Into<String>) {
        if self.chain_signature.is_none() {
            self.chain_signature = Some(signature.into());
        }
    }

    fn ensure_pending(&self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TransactionRecord {
        TransactionRecord::new(
            TxKind::Stake,
            HolderId::new("holder"),
            "stake 1 GOLD",
            DateTime::from_timestamp(0, 0).unwrap(),
        )
    }

    #[test]
    fn test_complete_is_final() {
        let mut tx = record();
        tx.complete("sig-1").unwrap();

        assert_eq!(tx.status, TxStatus::Completed);
        assert!(tx.fail(&ActionError::NotConnected).is_err());
        assert!(tx.complete("sig-2").is_err());
        assert_eq!(tx.chain_signature.as_deref(), Some("sig-1"));
    }

    #[test]
    fn test_fail_keeps_reason_and_kind() {
        let mut tx = record();
        tx.fail(&ActionError::TransactionFailed("user rejected".into()))
            .unwrap();

        assert_eq!(tx.status, TxStatus::Failed);
        assert_eq!(tx.error_kind, Some(ErrorKind::TransactionFailed));
        assert_eq!(tx.error.as_deref(), Some("transaction failed: user rejected"));
    }
}
