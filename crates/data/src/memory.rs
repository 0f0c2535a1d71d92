use crate::error::StoreError;
use crate::store::AccountStore;
use async_trait::async_trait;
use aurum_domain::entities::{HolderAccount, HolderId, PoolId, PoolState};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Account store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<HolderId, HolderAccount>>,
    pools: RwLock<HashMap<PoolId, PoolState>>,
    reject_writes: AtomicBool,
    rejected_holders: Mutex<HashSet<HolderId>>,
}

impl MemoryAccountStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with [`StoreError::Unavailable`].
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Makes every subsequent write touching `holder`'s account fail.
    pub fn reject_holder_writes(&self, holder: &HolderId) {
        if let Ok(mut rejected) = self.rejected_holders.lock() {
            rejected.insert(holder.clone());
        }
    }

    /// Number of stored holder accounts.
    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes rejected".to_string()));
        }
        Ok(())
    }

    fn check_account_writable(&self, holder: &HolderId) -> Result<(), StoreError> {
        self.check_writable()?;
        let rejected = self
            .rejected_holders
            .lock()
            .map(|rejected| rejected.contains(holder))
            .unwrap_or(false);
        if rejected {
            return Err(StoreError::Unavailable(format!("writes rejected for {holder}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn load_account(&self, holder: &HolderId) -> Result<Option<HolderAccount>, StoreError> {
        Ok(self.accounts.read().await.get(holder).cloned())
    }

    async fn save_account(&self, account: &HolderAccount) -> Result<(), StoreError> {
        self.check_account_writable(&account.holder)?;
        self.accounts
            .write()
            .await
            .insert(account.holder.clone(), account.clone());
        Ok(())
    }

    async fn load_pool(&self, pool: &PoolId) -> Result<Option<PoolState>, StoreError> {
        Ok(self.pools.read().await.get(pool).cloned())
    }

    async fn save_pool(&self, state: &PoolState) -> Result<(), StoreError> {
        self.check_writable()?;
        self.pools
            .write()
            .await
            .insert(state.pool.clone(), state.clone());
        Ok(())
    }

    async fn save_batch(&self, accounts: &[HolderAccount], pools: &[PoolState]) -> Result<(), StoreError> {
        self.check_writable()?;
        for account in accounts {
            self.check_account_writable(&account.holder)?;
        }
        let mut stored_accounts = self.accounts.write().await;
        let mut stored_pools = self.pools.write().await;
        for account in accounts {
            stored_accounts.insert(account.holder.clone(), account.clone());
        }
        for state in pools {
            stored_pools.insert(state.pool.clone(), state.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryAccountStore::new();
        let holder = HolderId::new("alice");
        assert!(store.load_account(&holder).await.unwrap().is_none());

        let mut account = HolderAccount::new(holder.clone(), DateTime::from_timestamp(0, 0).unwrap());
        account.balances.credit("GOLD", dec!(10)).unwrap();
        store.save_account(&account).await.unwrap();

        assert_eq!(store.load_account(&holder).await.unwrap(), Some(account));
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejected_writes() {
        let store = MemoryAccountStore::new();
        store.reject_writes(true);
        let pool = PoolState::new(PoolId::new("p"), "GOLD", "USDC", dec!(0), dec!(0));
        assert!(matches!(
            store.save_pool(&pool).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.load_pool(&pool.pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = MemoryAccountStore::new();
        let now = DateTime::from_timestamp(0, 0).unwrap();
        let alice = HolderAccount::new(HolderId::new("alice"), now);
        let bob = HolderAccount::new(HolderId::new("bob"), now);
        let pool = PoolState::new(PoolId::new("p"), "GOLD", "USDC", dec!(0), dec!(0));

        store.reject_holder_writes(&bob.holder);
        assert!(store.save_account(&alice).await.is_ok());
        assert!(store.save_account(&bob).await.is_err());

        let err = store
            .save_batch(&[alice.clone(), bob.clone()], std::slice::from_ref(&pool))
            .await;
        assert!(matches!(err, Err(StoreError::Unavailable(_))));
        assert!(store.load_account(&bob.holder).await.unwrap().is_none());
        assert!(store.load_pool(&pool.pool).await.unwrap().is_none());

        store.save_batch(&[alice], std::slice::from_ref(&pool)).await.unwrap();
        assert_eq!(store.load_pool(&pool.pool).await.unwrap(), Some(pool));
    }
}
