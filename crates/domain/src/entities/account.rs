use crate::entities::{BalanceSnapshot, HolderId, PoolId, PoolShare, StakePosition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything persisted for one holder.
///
/// Created implicitly on first interaction and never destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderAccount {
    pub holder: HolderId,
    pub balances: BalanceSnapshot,
    #[serde(default)]
    pub stakes: BTreeMap<PoolId, StakePosition>,
    #[serde(default)]
    pub pool_shares: BTreeMap<PoolId, PoolShare>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HolderAccount {
    pub fn new(holder: HolderId, now: DateTime<Utc>) -> Self {
        Self {
            holder,
            balances: BalanceSnapshot::new(),
            stakes: BTreeMap::new(),
            pool_shares: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Stake in `pool`, the empty position if none.
    pub fn stake(&self, pool: &PoolId) -> StakePosition {
        self.stakes.get(pool).cloned().unwrap_or_default()
    }

    pub fn stake_mut(&mut self, pool: &PoolId) -> &mut StakePosition {
        self.stakes.entry(pool.clone()).or_default()
    }

    /// Share of `pool`, the empty share if none.
    pub fn pool_share(&self, pool: &PoolId) -> PoolShare {
        self.pool_shares.get(pool).cloned().unwrap_or_default()
    }

    pub fn pool_share_mut(&mut self, pool: &PoolId) -> &mut PoolShare {
        self.pool_shares.entry(pool.clone()).or_default()
    }

    /// Removes empty stake and share entries.
    pub fn prune(&mut self) {
        self.stakes.retain(|_, stake| stake.is_staked());
        self.pool_shares
            .retain(|_, share| !share.share_units.is_zero() || !share.accrued_fees.is_zero());
    }
}
