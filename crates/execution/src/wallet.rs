//! Wallet session.

use aurum_protocols::signer::TransactionSigner;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// The currently connected wallet, if any.
#[derive(Default)]
pub struct WalletSession {
    signer: RwLock<Option<Arc<dyn TransactionSigner>>>,
}

impl WalletSession {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session already connected to `signer`.
    #[must_use]
    pub fn connected(signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            signer: RwLock::new(Some(signer)),
        }
    }

    pub async fn connect(&self, signer: Arc<dyn TransactionSigner>) {
        info!(address = %signer.address(), "Wallet connected");
        *self.signer.write().await = Some(signer);
    }

    pub async fn disconnect(&self) {
        if let Some(signer) = self.signer.write().await.take() {
            info!(address = %signer.address(), "Wallet disconnected");
        }
    }

    pub async fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        self.signer.read().await.clone()
    }

    /// Address of the connected wallet.
    pub async fn address(&self) -> Option<String> {
        self.signer.read().await.as_ref().map(|s| s.address())
    }

    pub async fn is_connected(&self) -> bool {
        self.signer.read().await.is_some()
    }
}
