use crate::error::StoreError;
use async_trait::async_trait;
use aurum_domain::entities::{HolderAccount, HolderId, PoolId, PoolState};

/// Durable storage scoped per holder, plus pool-wide state.
///
/// Writes replace the whole document; the last write wins.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Loads a holder's account, `None` if the holder was never seen.
    async fn load_account(&self, holder: &HolderId) -> Result<Option<HolderAccount>, StoreError>;

    async fn save_account(&self, account: &HolderAccount) -> Result<(), StoreError>;

    /// Loads a pool's state, `None` if the pool was never registered.
    async fn load_pool(&self, pool: &PoolId) -> Result<Option<PoolState>, StoreError>;

    async fn save_pool(&self, state: &PoolState) -> Result<(), StoreError>;

    /// Persists several documents as one write: either every document is
    /// stored or none is.
    async fn save_batch(&self, accounts: &[HolderAccount], pools: &[PoolState]) -> Result<(), StoreError>;
}
