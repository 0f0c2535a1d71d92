use async_trait::async_trait;
use aurum_domain::entities::{HolderId, TxKind};
use aurum_domain::error::ActionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a signer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// No wallet is connected.
    #[error("signer unavailable")]
    Unavailable,
    /// The wallet refused to sign.
    #[error("signing rejected: {0}")]
    Rejected(String),
    /// The network did not accept the transaction.
    #[error("broadcast failed: {0}")]
    Broadcast(String),
    /// The transaction was broadcast but did not confirm.
    #[error("confirmation failed: {0}")]
    Confirmation(String),
}

impl From<SignerError> for ActionError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Unavailable => ActionError::NotConnected,
            other => ActionError::TransactionFailed(other.to_string()),
        }
    }
}

/// Description of a ledger action handed to the wallet for signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInstruction {
    pub kind: TxKind,
    pub holder: HolderId,
    /// Short human-readable description shown in the wallet prompt.
    pub summary: String,
    /// Action-specific parameters, e.g. pool and amount.
    pub params: serde_json::Value,
}

/// A transaction ready to be signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UnsignedTransaction {
    /// Built locally from an action.
    Instruction(ActionInstruction),
    /// Pre-built by a third party, e.g. a base64 swap transaction from the aggregator.
    Serialized {
        payload: String,
        last_valid_block_height: Option<u64>,
    },
}

impl UnsignedTransaction {
    /// Short label for logging.
    pub fn label(&self) -> String {
        match self {
            Self::Instruction(ix) => ix.summary.clone(),
            Self::Serialized { payload, .. } => {
                format!("serialized transaction ({} bytes)", payload.len())
            }
        }
    }
}

/// A signed transaction, opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub signer: String,
    pub payload: String,
}

/// The wallet: signs, broadcasts and confirms transactions.
///
/// Calls may suspend for user interaction and are not cancellable once
/// started.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Public address of the connected wallet.
    fn address(&self) -> String;

    /// Signs a transaction.
    async fn sign(&self, tx: UnsignedTransaction) -> Result<SignedTransaction, SignerError>;

    /// Submits a signed transaction and returns its chain signature.
    async fn broadcast(&self, signed: &SignedTransaction) -> Result<String, SignerError>;

    /// Waits for the transaction behind `signature` to confirm.
    async fn confirm(&self, signature: &str) -> Result<(), SignerError>;
}
