//! Per-holder and per-pool critical sections over an [`AccountStore`].
//!
//! Every read-modify-write of a holder's account goes through an
//! [`AccountGuard`]: acquiring it takes the holder's lock and loads the typed
//! record, [`AccountGuard::commit`] persists it, and dropping the guard without
//! committing discards the changes. Pool state works the same way through
//! [`PoolGuard`]. When both are needed the holder guard is taken first, and
//! two holders are locked in id order. Guards that change together are
//! committed together with [`AccountGuard::commit_with_pool`] or
//! [`AccountGuard::commit_with`].

use crate::error::StoreError;
use crate::store::AccountStore;
use aurum_domain::clock::Clock;
use aurum_domain::entities::{HolderAccount, HolderId, PoolId, PoolState};
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

type LockTable<K> = Mutex<HashMap<K, Arc<Mutex<()>>>>;

async fn lock_key<K: Eq + Hash + Clone>(table: &LockTable<K>, key: &K) -> OwnedMutexGuard<()> {
    let lock = {
        let mut table = table.lock().await;
        table.entry(key.clone()).or_default().clone()
    };
    lock.lock_owned().await
}

/// Typed account access with per-key locking.
pub struct AccountBook {
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    holder_locks: LockTable<HolderId>,
    pool_locks: LockTable<PoolId>,
}

impl AccountBook {
    /// Creates a new AccountBook.
    pub fn new(store: Arc<dyn AccountStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            holder_locks: Mutex::new(HashMap::new()),
            pool_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Locks `holder` and loads the account, creating an empty one on first use.
    ///
    /// # Errors
    /// Returns an error if the store read fails.
    pub async fn holder(&self, holder: &HolderId) -> Result<AccountGuard, StoreError> {
        let lock = lock_key(&self.holder_locks, holder).await;
        let account = match self.store.load_account(holder).await? {
            Some(account) => account,
            None => {
                debug!(holder = %holder, "Creating account");
                HolderAccount::new(holder.clone(), self.clock.now())
            }
        };
        Ok(AccountGuard {
            _lock: lock,
            account,
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        })
    }

    /// Locks `holder` and loads the account, `None` if it was never stored.
    ///
    /// # Errors
    /// Returns an error if the store read fails.
    pub async fn existing_holder(&self, holder: &HolderId) -> Result<Option<AccountGuard>, StoreError> {
        let lock = lock_key(&self.holder_locks, holder).await;
        let Some(account) = self.store.load_account(holder).await? else {
            return Ok(None);
        };
        Ok(Some(AccountGuard {
            _lock: lock,
            account,
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }))
    }

    /// Locks `from` and `to` in id order and loads both accounts.
    ///
    /// The recipient is `None` if it was never stored or is `from` itself.
    ///
    /// # Errors
    /// Returns an error if a store read fails.
    pub async fn holder_pair(
        &self,
        from: &HolderId,
        to: &HolderId,
    ) -> Result<(AccountGuard, Option<AccountGuard>), StoreError> {
        if from == to {
            return Ok((self.holder(from).await?, None));
        }
        if from < to {
            let sender = self.holder(from).await?;
            let recipient = self.existing_holder(to).await?;
            Ok((sender, recipient))
        } else {
            let recipient = self.existing_holder(to).await?;
            let sender = self.holder(from).await?;
            Ok((sender, recipient))
        }
    }

    /// Locks `pool` and loads its state, `None` if the pool is not registered.
    ///
    /// # Errors
    /// Returns an error if the store read fails.
    pub async fn pool(&self, pool: &PoolId) -> Result<Option<PoolGuard>, StoreError> {
        let lock = lock_key(&self.pool_locks, pool).await;
        let Some(state) = self.store.load_pool(pool).await? else {
            return Ok(None);
        };
        Ok(Some(PoolGuard {
            _lock: lock,
            state,
            store: Arc::clone(&self.store),
        }))
    }

    /// Current account without taking the lock, for read-only views.
    ///
    /// # Errors
    /// Returns an error if the store read fails.
    pub async fn read_holder(&self, holder: &HolderId) -> Result<HolderAccount, StoreError> {
        Ok(self
            .store
            .load_account(holder)
            .await?
            .unwrap_or_else(|| HolderAccount::new(holder.clone(), self.clock.now())))
    }

    /// Current pool state without taking the lock.
    ///
    /// # Errors
    /// Returns an error if the store read fails.
    pub async fn read_pool(&self, pool: &PoolId) -> Result<Option<PoolState>, StoreError> {
        self.store.load_pool(pool).await
    }

    /// Registers a pool unless it already exists; returns the stored state.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn register_pool(&self, state: PoolState) -> Result<PoolState, StoreError> {
        let _lock = lock_key(&self.pool_locks, &state.pool).await;
        if let Some(existing) = self.store.load_pool(&state.pool).await? {
            return Ok(existing);
        }
        self.store.save_pool(&state).await?;
        info!(pool = %state.pool, base = %state.base_token, "Pool registered");
        Ok(state)
    }
}

/// Locked, mutable view of one holder's account.
pub struct AccountGuard {
    _lock: OwnedMutexGuard<()>,
    account: HolderAccount,
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
}

impl AccountGuard {
    /// Persists the account and releases the lock.
    ///
    /// # Errors
    /// Returns an error if the store write fails; the change is then lost.
    pub async fn commit(mut self) -> Result<HolderAccount, StoreError> {
        self.seal();
        self.store.save_account(&self.account).await?;
        Ok(self.account)
    }

    /// Persists the account and `pool` in one store write.
    ///
    /// # Errors
    /// Returns an error if the write fails; neither change is stored then.
    pub async fn commit_with_pool(mut self, pool: PoolGuard) -> Result<(HolderAccount, PoolState), StoreError> {
        self.seal();
        self.store
            .save_batch(std::slice::from_ref(&self.account), std::slice::from_ref(&pool.state))
            .await?;
        Ok((self.account, pool.state))
    }

    /// Persists this account and `other` in one store write.
    ///
    /// # Errors
    /// Returns an error if the write fails; neither change is stored then.
    pub async fn commit_with(mut self, mut other: AccountGuard) -> Result<(HolderAccount, HolderAccount), StoreError> {
        self.seal();
        other.seal();
        let accounts = [self.account, other.account];
        self.store.save_batch(&accounts, &[]).await?;
        let [first, second] = accounts;
        Ok((first, second))
    }

    fn seal(&mut self) {
        self.account.prune();
        self.account.updated_at = self.clock.now();
    }
}

impl Deref for AccountGuard {
    type Target = HolderAccount;

    fn deref(&self) -> &Self::Target {
        &self.account
    }
}

impl DerefMut for AccountGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.account
    }
}

/// Locked, mutable view of one pool's state.
pub struct PoolGuard {
    _lock: OwnedMutexGuard<()>,
    state: PoolState,
    store: Arc<dyn AccountStore>,
}

impl PoolGuard {
    /// Persists the pool state and releases the lock.
    ///
    /// # Errors
    /// Returns an error if the store write fails.
    pub async fn commit(self) -> Result<PoolState, StoreError> {
        self.store.save_pool(&self.state).await?;
        Ok(self.state)
    }
}

impl Deref for PoolGuard {
    type Target = PoolState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl DerefMut for PoolGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}
