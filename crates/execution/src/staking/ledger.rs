//! Staking ledger.
//!
//! Holders lock tokens into a staking pool and earn simple, non-compounding
//! rewards at the configured APY. Stakes stay locked for the minimum lock
//! duration counted from the stake start time; a claim pays out and restarts
//! that clock.

use crate::config::StakingPolicy;
use crate::lifecycle::TransactionExecutor;
use aurum_data::AccountBook;
use aurum_domain::entities::{HolderId, PoolId, StakePosition, StakeView, TxKind};
use aurum_domain::error::ActionError;
use aurum_domain::math::rewards::pending_reward;
use aurum_protocols::signer::{ActionInstruction, UnsignedTransaction};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Staking operations over holder accounts.
pub struct StakingLedger {
    book: Arc<AccountBook>,
    executor: Arc<TransactionExecutor>,
    policy: StakingPolicy,
    /// Staked token per pool.
    pools: HashMap<PoolId, String>,
}

impl StakingLedger {
    /// Creates a new StakingLedger without pools.
    pub fn new(book: Arc<AccountBook>, executor: Arc<TransactionExecutor>, policy: StakingPolicy) -> Self {
        Self {
            book,
            executor,
            policy,
            pools: HashMap::new(),
        }
    }

    /// Adds a staking pool accepting `token`.
    #[must_use]
    pub fn with_pool(mut self, pool: PoolId, token: impl Into<String>) -> Self {
        self.pools.insert(pool, token.into());
        self
    }

    pub fn policy(&self) -> StakingPolicy {
        self.policy
    }

    /// Stakes `amount` from the holder's balance.
    ///
    /// The reward clock starts on the first stake and is not moved by later
    /// additions.
    ///
    /// # Errors
    /// `InvalidAmount`, `UnknownPool`, `InsufficientBalance`, or a signer,
    /// chain or storage failure.
    pub async fn stake(
        &self,
        holder: &HolderId,
        pool: &PoolId,
        amount: Decimal,
    ) -> Result<StakePosition, ActionError> {
        let kind = TxKind::Stake;
        if amount <= Decimal::ZERO {
            return Err(self.reject(kind, ActionError::InvalidAmount { amount }));
        }
        let token = self.token(kind, pool)?;
        let account = self.book.holder(holder).await.map_err(|e| self.reject(kind, e))?;
        if let Err(e) = account.balances.ensure_available(&token, amount) {
            return Err(self.reject(kind, e));
        }

        let summary = format!("stake {amount} {token}");
        let tx = self.instruction(kind, holder, &summary, pool, amount);
        let clock = Arc::clone(self.book.clock());
        let pool_id = pool.clone();

        let executed = self
            .executor
            .execute(
                kind,
                holder,
                summary,
                |_signer| async move { Ok(tx) },
                move |_signature| async move {
                    let mut account = account;
                    account.balances.debit(&token, amount)?;
                    account.stake_mut(&pool_id).add(amount, clock.now())?;
                    let account = account.commit().await?;
                    Ok(account.stake(&pool_id))
                },
            )
            .await?;

        info!(
            holder = %holder,
            pool = %pool,
            amount = %amount,
            staked = %executed.value.staked_amount,
            "Stake committed"
        );
        Ok(executed.value)
    }

    /// Returns `amount` of staked tokens to the holder's balance.
    ///
    /// # Errors
    /// `InvalidAmount`, `UnknownPool`, `InsufficientStake`, `LockActive`
    /// while `now < start + min_lock`, or a signer, chain or storage failure.
    pub async fn unstake(
        &self,
        holder: &HolderId,
        pool: &PoolId,
        amount: Decimal,
    ) -> Result<StakePosition, ActionError> {
        let kind = TxKind::Unstake;
        if amount <= Decimal::ZERO {
            return Err(self.reject(kind, ActionError::InvalidAmount { amount }));
        }
        let token = self.token(kind, pool)?;
        let account = self.book.holder(holder).await.map_err(|e| self.reject(kind, e))?;

        let position = account.stake(pool);
        if amount > position.staked_amount {
            return Err(self.reject(
                kind,
                ActionError::InsufficientStake {
                    requested: amount,
                    staked: position.staked_amount,
                },
            ));
        }
        let remaining = position.lock_remaining(self.policy.min_lock, self.book.clock().now());
        if remaining > chrono::Duration::zero() {
            return Err(self.reject(
                kind,
                ActionError::LockActive {
                    remaining_secs: remaining.num_seconds(),
                },
            ));
        }

        let summary = format!("unstake {amount} {token}");
        let tx = self.instruction(kind, holder, &summary, pool, amount);
        let pool_id = pool.clone();

        let executed = self
            .executor
            .execute(
                kind,
                holder,
                summary,
                |_signer| async move { Ok(tx) },
                move |_signature| async move {
                    let mut account = account;
                    account.stake_mut(&pool_id).remove(amount)?;
                    account.balances.credit(token, amount)?;
                    let account = account.commit().await?;
                    Ok(account.stake(&pool_id))
                },
            )
            .await?;

        info!(holder = %holder, pool = %pool, amount = %amount, "Unstake committed");
        Ok(executed.value)
    }

    /// Rewards accrued since the stake clock started, 0 if not staked.
    ///
    /// # Errors
    /// `UnknownPool` or a storage failure.
    pub async fn pending_rewards(&self, holder: &HolderId, pool: &PoolId) -> Result<Decimal, ActionError> {
        if !self.pools.contains_key(pool) {
            return Err(ActionError::UnknownPool(pool.clone()));
        }
        let account = self.book.read_holder(holder).await?;
        let position = account.stake(pool);
        Ok(pending_reward(
            position.staked_amount,
            self.policy.apy,
            position.stake_start_time,
            self.book.clock().now(),
        ))
    }

    /// Pays out pending rewards and restarts the reward clock.
    ///
    /// The amount paid is recomputed when the claim commits.
    ///
    /// # Errors
    /// `UnknownPool`, `NothingToClaim`, or a signer, chain or storage failure.
    pub async fn claim(&self, holder: &HolderId, pool: &PoolId) -> Result<Decimal, ActionError> {
        let kind = TxKind::Claim;
        let token = self.token(kind, pool)?;
        let account = self.book.holder(holder).await.map_err(|e| self.reject(kind, e))?;

        let position = account.stake(pool);
        let apy = self.policy.apy;
        let pending = pending_reward(
            position.staked_amount,
            apy,
            position.stake_start_time,
            self.book.clock().now(),
        );
        if pending <= Decimal::ZERO {
            return Err(self.reject(kind, ActionError::NothingToClaim));
        }

        let summary = format!("claim {} {token}", pending.round_dp(6));
        let tx = self.instruction(kind, holder, &summary, pool, pending);
        let clock = Arc::clone(self.book.clock());
        let pool_id = pool.clone();

        let executed = self
            .executor
            .execute(
                kind,
                holder,
                summary,
                |_signer| async move { Ok(tx) },
                move |_signature| async move {
                    let mut account = account;
                    let now = clock.now();
                    let position = account.stake(&pool_id);
                    let reward =
                        pending_reward(position.staked_amount, apy, position.stake_start_time, now);
                    account.balances.credit(token, reward)?;
                    account.stake_mut(&pool_id).restart_clock(now);
                    account.commit().await?;
                    Ok(reward)
                },
            )
            .await?;

        info!(holder = %holder, pool = %pool, reward = %executed.value, "Rewards claimed");
        Ok(executed.value)
    }

    /// Stake position with pending rewards and remaining lock time.
    ///
    /// # Errors
    /// `UnknownPool` or a storage failure.
    pub async fn view(&self, holder: &HolderId, pool: &PoolId) -> Result<StakeView, ActionError> {
        if !self.pools.contains_key(pool) {
            return Err(ActionError::UnknownPool(pool.clone()));
        }
        let account = self.book.read_holder(holder).await?;
        let position = account.stake(pool);
        let now = self.book.clock().now();
        let view = StakeView {
            staked_amount: position.staked_amount,
            stake_start_time: position.stake_start_time,
            pending_rewards: pending_reward(
                position.staked_amount,
                self.policy.apy,
                position.stake_start_time,
                now,
            ),
            lock_remaining_secs: position.lock_remaining(self.policy.min_lock, now).num_seconds(),
        };
        debug!(holder = %holder, pool = %pool, pending = %view.pending_rewards, "Stake view");
        Ok(view)
    }

    fn token(&self, kind: TxKind, pool: &PoolId) -> Result<String, ActionError> {
        self.pools
            .get(pool)
            .cloned()
            .ok_or_else(|| self.reject(kind, ActionError::UnknownPool(pool.clone())))
    }

    fn reject(&self, kind: TxKind, err: impl Into<ActionError>) -> ActionError {
        self.executor.reject(kind, err.into())
    }

    fn instruction(
        &self,
        kind: TxKind,
        holder: &HolderId,
        summary: &str,
        pool: &PoolId,
        amount: Decimal,
    ) -> UnsignedTransaction {
        UnsignedTransaction::Instruction(ActionInstruction {
            kind,
            holder: holder.clone(),
            summary: summary.to_string(),
            params: json!({ "pool": pool, "amount": amount }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use aurum_domain::entities::TxStatus;
    use aurum_domain::error::ErrorKind;
    use aurum_protocols::signer::SignerError;
    use aurum_protocols::testing::SignerStage;
    use rust_decimal_macros::dec;

    fn policy() -> StakingPolicy {
        StakingPolicy {
            apy: dec!(0.12),
            min_lock: chrono::Duration::days(7),
        }
    }

    fn ledger(h: &Harness) -> StakingLedger {
        StakingLedger::new(h.book.clone(), h.executor.clone(), policy())
            .with_pool(PoolId::new("gold-staking"), "GOLD")
    }

    fn ids() -> (HolderId, PoolId) {
        (HolderId::new("alice"), PoolId::new("gold-staking"))
    }

    #[tokio::test]
    async fn test_stake_week_and_claim() {
        let h = Harness::new();
        let ledger = ledger(&h);
        let (alice, pool) = ids();
        h.fund(&alice, "GOLD", dec!(1000)).await;

        let position = ledger.stake(&alice, &pool, dec!(400)).await.unwrap();
        assert_eq!(position.staked_amount, dec!(400));
        assert_eq!(h.balance(&alice, "GOLD").await, dec!(600));

        h.advance_days(7);
        let pending = ledger.pending_rewards(&alice, &pool).await.unwrap();
        assert_eq!(pending.round_dp(2), dec!(0.92));

        let claimed = ledger.claim(&alice, &pool).await.unwrap();
        assert_eq!(claimed, pending);
        assert_eq!(h.balance(&alice, "GOLD").await.round_dp(2), dec!(600.92));
        assert_eq!(ledger.pending_rewards(&alice, &pool).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_second_stake_keeps_start_time() {
        let h = Harness::new();
        let ledger = ledger(&h);
        let (alice, pool) = ids();
        h.fund(&alice, "GOLD", dec!(100)).await;

        let first = ledger.stake(&alice, &pool, dec!(30)).await.unwrap();
        h.advance_days(1);
        let second = ledger.stake(&alice, &pool, dec!(20.5)).await.unwrap();

        assert_eq!(second.staked_amount, dec!(50.5));
        assert_eq!(second.stake_start_time, first.stake_start_time);
    }

    #[tokio::test]
    async fn test_validation_errors_do_not_mutate() {
        let h = Harness::new();
        let ledger = ledger(&h);
        let (alice, pool) = ids();
        h.fund(&alice, "GOLD", dec!(10)).await;

        let err = ledger.stake(&alice, &pool, Decimal::ZERO).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        let err = ledger.stake(&alice, &pool, dec!(10.01)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        let err = ledger.stake(&alice, &PoolId::new("nope"), dec!(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownPool);
        let err = ledger.claim(&alice, &pool).await.unwrap_err();
        assert_eq!(err, ActionError::NothingToClaim);

        assert_eq!(h.balance(&alice, "GOLD").await, dec!(10));
        assert!(h.executor.history().is_empty().await);
        assert!(h.signer.signed().is_empty());
    }

    #[tokio::test]
    async fn test_unstake_lock_boundary() {
        let h = Harness::new();
        let ledger = ledger(&h);
        let (alice, pool) = ids();
        h.fund(&alice, "GOLD", dec!(100)).await;
        ledger.stake(&alice, &pool, dec!(100)).await.unwrap();

        h.clock.advance(chrono::Duration::days(7) - chrono::Duration::seconds(1));
        let err = ledger.unstake(&alice, &pool, dec!(40)).await.unwrap_err();
        assert_eq!(err, ActionError::LockActive { remaining_secs: 1 });

        h.clock.advance(chrono::Duration::seconds(1));
        let position = ledger.unstake(&alice, &pool, dec!(40)).await.unwrap();
        assert_eq!(position.staked_amount, dec!(60));
        assert_eq!(h.balance(&alice, "GOLD").await, dec!(40));

        let err = ledger.unstake(&alice, &pool, dec!(60.1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStake);

        let position = ledger.unstake(&alice, &pool, dec!(60)).await.unwrap();
        assert_eq!(position, StakePosition::default());
    }

    #[tokio::test]
    async fn test_signer_failure_leaves_state_untouched() {
        let h = Harness::new();
        let ledger = ledger(&h);
        let (alice, pool) = ids();
        h.fund(&alice, "GOLD", dec!(50)).await;
        h.signer
            .fail_at(SignerStage::Sign, SignerError::Rejected("user declined".into()));

        let err = ledger.stake(&alice, &pool, dec!(5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert_eq!(h.balance(&alice, "GOLD").await, dec!(50));

        let record = &h.executor.history().recent().await[0];
        assert_eq!(record.status, TxStatus::Failed);
        assert!(record.error.as_deref().unwrap_or_default().contains("user declined"));
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let h = Harness::new();
        let ledger = ledger(&h);
        let (alice, pool) = ids();
        h.fund(&alice, "GOLD", dec!(50)).await;
        h.store.reject_writes(true);

        let err = ledger.stake(&alice, &pool, dec!(5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageError);
        h.store.reject_writes(false);
        assert_eq!(h.balance(&alice, "GOLD").await, dec!(50));
    }

    #[tokio::test]
    async fn test_view() {
        let h = Harness::new();
        let ledger = ledger(&h);
        let (alice, pool) = ids();
        h.fund(&alice, "GOLD", dec!(365)).await;
        ledger.stake(&alice, &pool, dec!(365)).await.unwrap();
        h.advance_days(2);

        let view = ledger.view(&alice, &pool).await.unwrap();
        assert_eq!(view.staked_amount, dec!(365));
        assert_eq!(view.lock_remaining_secs, 5 * 86_400);
        // 365 * 0.12 / 365 * 2
        assert_eq!(view.pending_rewards.round_dp(10), dec!(0.24));
    }
}
