//! Periodic pending-reward refresh for watched stakes.

use super::StakingLedger;
use aurum_domain::entities::{HolderId, PoolId};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, warn};

/// Pending rewards by holder and pool.
pub type RewardBoard = BTreeMap<(HolderId, PoolId), Decimal>;

/// Recomputes pending rewards for watched stakes and publishes them.
///
/// Reads only; rewards are paid by [`StakingLedger::claim`].
pub struct RewardTicker {
    ledger: Arc<StakingLedger>,
    watched: RwLock<BTreeSet<(HolderId, PoolId)>>,
    board: watch::Sender<RewardBoard>,
}

impl RewardTicker {
    /// Creates a new RewardTicker.
    pub fn new(ledger: Arc<StakingLedger>) -> Self {
        let (board, _) = watch::channel(RewardBoard::new());
        Self {
            ledger,
            watched: RwLock::new(BTreeSet::new()),
            board,
        }
    }

    pub async fn watch(&self, holder: HolderId, pool: PoolId) {
        self.watched.write().await.insert((holder, pool));
    }

    pub async fn unwatch(&self, holder: &HolderId, pool: &PoolId) {
        let key = (holder.clone(), pool.clone());
        self.watched.write().await.remove(&key);
        self.board.send_if_modified(|board| board.remove(&key).is_some());
    }

    pub fn subscribe(&self) -> watch::Receiver<RewardBoard> {
        self.board.subscribe()
    }

    pub fn current(&self) -> RewardBoard {
        self.board.borrow().clone()
    }

    /// Refreshes every watched stake; returns how many were updated.
    ///
    /// A stake whose read fails keeps its previous value.
    pub async fn tick(&self) -> usize {
        let watched: Vec<_> = self.watched.read().await.iter().cloned().collect();
        let mut updates = Vec::with_capacity(watched.len());
        for (holder, pool) in watched {
            match self.ledger.pending_rewards(&holder, &pool).await {
                Ok(pending) => updates.push(((holder, pool), pending)),
                Err(e) => warn!(holder = %holder, pool = %pool, error = %e, "Reward refresh failed"),
            }
        }

        let updated = updates.len();
        self.board.send_modify(|board| board.extend(updates));
        debug!(updated, "Rewards refreshed");
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StakingPolicy;
    use crate::testing::Harness;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_tick_publishes_growing_rewards() {
        let h = Harness::new();
        let pool = PoolId::new("gold-staking");
        let policy = StakingPolicy {
            apy: dec!(0.12),
            min_lock: chrono::Duration::days(7),
        };
        let ledger = Arc::new(
            StakingLedger::new(h.book.clone(), h.executor.clone(), policy)
                .with_pool(pool.clone(), "GOLD"),
        );
        let alice = HolderId::new("alice");
        h.fund(&alice, "GOLD", dec!(1000)).await;
        ledger.stake(&alice, &pool, dec!(1000)).await.unwrap();

        let ticker = RewardTicker::new(ledger);
        ticker.watch(alice.clone(), pool.clone()).await;
        ticker.watch(HolderId::new("bob"), PoolId::new("unknown")).await;
        let mut rx = ticker.subscribe();

        h.advance_days(1);
        assert_eq!(ticker.tick().await, 1);
        assert!(rx.has_changed().unwrap());
        let day_one = rx.borrow_and_update()[&(alice.clone(), pool.clone())];
        assert!(day_one > Decimal::ZERO);

        h.advance_days(1);
        ticker.tick().await;
        let day_two = ticker.current()[&(alice.clone(), pool.clone())];
        assert!(day_two > day_one);

        ticker.unwatch(&alice, &pool).await;
        assert!(ticker.current().is_empty());
    }
}
