//! Holder accounts in a single liquidity pool.
//!
//! Holders deposit the pool's base token and receive share units at the
//! pool's current rate `total_share_units / reserve_a`. Fees accrue to share
//! units through the pool's fee-per-share accumulator and are settled into
//! the holder's record whenever its share count changes.

use super::PoolSnapshotService;
use crate::lifecycle::TransactionExecutor;
use aurum_data::AccountBook;
use aurum_domain::entities::{
    HolderId, PoolId, PoolPosition, PoolShare, PoolSnapshot, PoolState, TxKind,
};
use aurum_domain::error::ActionError;
use aurum_domain::math::pool_shares::{
    accrue_fee_per_share, amount_for_shares, pending_fees, share_percentage, shares_for_deposit,
};
use aurum_protocols::signer::{ActionInstruction, UnsignedTransaction};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Brings the fee accumulator up to `now`.
fn accrue(state: &mut PoolState, now: DateTime<Utc>) {
    if let Some(last) = state.last_accrual {
        state.fee_per_share = accrue_fee_per_share(
            state.fee_per_share,
            state.daily_fee_emission,
            state.total_share_units,
            (now - last).num_seconds(),
        );
    }
    state.last_accrual = Some(now);
}

/// Moves fees accrued since the holder's checkpoint into `accrued_fees`.
fn settle(share: &mut PoolShare, fee_per_share: Decimal) {
    share.accrued_fees = pending_fees(
        share.share_units,
        fee_per_share,
        share.fee_checkpoint,
        share.accrued_fees,
    );
    share.fee_checkpoint = fee_per_share;
}

fn checked_sum(total: Decimal, amount: Decimal) -> Result<Decimal, ActionError> {
    total
        .checked_add(amount)
        .ok_or(ActionError::InvalidAmount { amount })
}

/// Fee-per-share as of `now`, without touching the stored state.
fn projected_fee_per_share(state: &PoolState, now: DateTime<Utc>) -> Decimal {
    let mut state = state.clone();
    accrue(&mut state, now);
    state.fee_per_share
}

/// Deposit, withdrawal and fee claims for one pool.
pub struct PoolAccountService {
    pool: PoolId,
    book: Arc<AccountBook>,
    executor: Arc<TransactionExecutor>,
    snapshots: Option<Arc<PoolSnapshotService>>,
}

impl PoolAccountService {
    /// Creates a new PoolAccountService.
    pub fn new(pool: PoolId, book: Arc<AccountBook>, executor: Arc<TransactionExecutor>) -> Self {
        Self {
            pool,
            book,
            executor,
            snapshots: None,
        }
    }

    /// Uses `snapshots` for [`Self::pool_snapshot`] and position values.
    #[must_use]
    pub fn with_snapshots(mut self, snapshots: Arc<PoolSnapshotService>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn pool(&self) -> &PoolId {
        &self.pool
    }

    /// Deposits `amount` base tokens; returns the share units minted.
    ///
    /// # Errors
    /// `InvalidAmount`, `UnknownPool`, `InsufficientBalance`, or a signer,
    /// chain or storage failure.
    pub async fn add_liquidity(&self, holder: &HolderId, amount: Decimal) -> Result<Decimal, ActionError> {
        let kind = TxKind::AddLiquidity;
        if amount <= Decimal::ZERO {
            return Err(self.reject(kind, ActionError::InvalidAmount { amount }));
        }
        let state = self.state(kind).await?;
        let token = state.base_token.clone();
        let account = self.book.holder(holder).await.map_err(|e| self.reject(kind, e))?;
        if let Err(e) = account.balances.ensure_available(&token, amount) {
            return Err(self.reject(kind, e));
        }

        let summary = format!("add {amount} {token} to {}", self.pool);
        let tx = self.instruction(kind, holder, &summary, json!({ "amount": amount }));
        let book = Arc::clone(&self.book);
        let pool_id = self.pool.clone();

        let executed = self
            .executor
            .execute(
                kind,
                holder,
                summary,
                |_signer| async move { Ok(tx) },
                move |_signature| async move {
                    let mut account = account;
                    let mut pool = book
                        .pool(&pool_id)
                        .await?
                        .ok_or_else(|| ActionError::UnknownPool(pool_id.clone()))?;
                    accrue(&mut pool, book.clock().now());

                    let minted = shares_for_deposit(amount, pool.total_share_units, pool.reserve_a);
                    account.balances.debit(&token, amount)?;
                    let fee_per_share = pool.fee_per_share;
                    let share = account.pool_share_mut(&pool_id);
                    settle(share, fee_per_share);
                    share.share_units = checked_sum(share.share_units, minted)?;
                    pool.total_share_units = checked_sum(pool.total_share_units, minted)?;
                    pool.reserve_a = checked_sum(pool.reserve_a, amount)?;

                    account.commit_with_pool(pool).await?;
                    Ok(minted)
                },
            )
            .await?;

        info!(holder = %holder, pool = %self.pool, amount = %amount, minted = %executed.value, "Liquidity added");
        Ok(executed.value)
    }

    /// Burns `share_amount` units; returns the base tokens paid out.
    ///
    /// # Errors
    /// `InvalidAmount`, `UnknownPool`, `InsufficientShares`, or a signer,
    /// chain or storage failure.
    pub async fn remove_liquidity(
        &self,
        holder: &HolderId,
        share_amount: Decimal,
    ) -> Result<Decimal, ActionError> {
        let kind = TxKind::RemoveLiquidity;
        if share_amount <= Decimal::ZERO {
            return Err(self.reject(kind, ActionError::InvalidAmount { amount: share_amount }));
        }
        let state = self.state(kind).await?;
        let token = state.base_token.clone();
        let account = self.book.holder(holder).await.map_err(|e| self.reject(kind, e))?;
        let held = account.pool_share(&self.pool).share_units;
        if share_amount > held {
            return Err(self.reject(
                kind,
                ActionError::InsufficientShares {
                    requested: share_amount,
                    held,
                },
            ));
        }

        let summary = format!("remove {share_amount} shares from {}", self.pool);
        let tx = self.instruction(kind, holder, &summary, json!({ "shares": share_amount }));
        let book = Arc::clone(&self.book);
        let pool_id = self.pool.clone();

        let executed = self
            .executor
            .execute(
                kind,
                holder,
                summary,
                |_signer| async move { Ok(tx) },
                move |_signature| async move {
                    let mut account = account;
                    let mut pool = book
                        .pool(&pool_id)
                        .await?
                        .ok_or_else(|| ActionError::UnknownPool(pool_id.clone()))?;
                    accrue(&mut pool, book.clock().now());

                    let amount = amount_for_shares(share_amount, pool.total_share_units, pool.reserve_a);
                    let fee_per_share = pool.fee_per_share;
                    let share = account.pool_share_mut(&pool_id);
                    settle(share, fee_per_share);
                    share.share_units -= share_amount;
                    pool.total_share_units -= share_amount;
                    pool.reserve_a -= amount;
                    account.balances.credit(token, amount)?;

                    account.commit_with_pool(pool).await?;
                    Ok(amount)
                },
            )
            .await?;

        info!(holder = %holder, pool = %self.pool, shares = %share_amount, amount = %executed.value, "Liquidity removed");
        Ok(executed.value)
    }

    /// Pays out the holder's accrued fees.
    ///
    /// # Errors
    /// `UnknownPool`, `NothingToClaim`, or a signer, chain or storage failure.
    pub async fn claim_fees(&self, holder: &HolderId) -> Result<Decimal, ActionError> {
        let kind = TxKind::Claim;
        let state = self.state(kind).await?;
        let token = state.base_token.clone();
        let account = self.book.holder(holder).await.map_err(|e| self.reject(kind, e))?;
        let share = account.pool_share(&self.pool);
        let fee_per_share = projected_fee_per_share(&state, self.book.clock().now());
        let pending = pending_fees(
            share.share_units,
            fee_per_share,
            share.fee_checkpoint,
            share.accrued_fees,
        );
        if pending <= Decimal::ZERO {
            return Err(self.reject(kind, ActionError::NothingToClaim));
        }

        let summary = format!("claim {} {token} fees from {}", pending.round_dp(6), self.pool);
        let tx = self.instruction(kind, holder, &summary, json!({ "fees": pending }));
        let book = Arc::clone(&self.book);
        let pool_id = self.pool.clone();

        let executed = self
            .executor
            .execute(
                kind,
                holder,
                summary,
                |_signer| async move { Ok(tx) },
                move |_signature| async move {
                    let mut account = account;
                    let mut pool = book
                        .pool(&pool_id)
                        .await?
                        .ok_or_else(|| ActionError::UnknownPool(pool_id.clone()))?;
                    accrue(&mut pool, book.clock().now());

                    let fee_per_share = pool.fee_per_share;
                    let share = account.pool_share_mut(&pool_id);
                    settle(share, fee_per_share);
                    let fees = std::mem::take(&mut share.accrued_fees);
                    account.balances.credit(token, fees)?;

                    account.commit_with_pool(pool).await?;
                    Ok(fees)
                },
            )
            .await?;

        info!(holder = %holder, pool = %self.pool, fees = %executed.value, "Pool fees claimed");
        Ok(executed.value)
    }

    /// Latest pool snapshot, `None` before the first refresh.
    pub async fn pool_snapshot(&self) -> Option<PoolSnapshot> {
        match &self.snapshots {
            Some(snapshots) => snapshots.latest().await,
            None => None,
        }
    }

    /// The holder's share, ownership fraction, value and pending fees.
    ///
    /// # Errors
    /// `UnknownPool` or a storage failure.
    pub async fn position(&self, holder: &HolderId) -> Result<PoolPosition, ActionError> {
        let state = self
            .book
            .read_pool(&self.pool)
            .await?
            .ok_or_else(|| ActionError::UnknownPool(self.pool.clone()))?;
        let share = self.book.read_holder(holder).await?.pool_share(&self.pool);
        let fee_per_share = projected_fee_per_share(&state, self.book.clock().now());
        let percentage = share_percentage(share.share_units, state.total_share_units);

        Ok(PoolPosition {
            share_units: share.share_units,
            percentage,
            value: self.pool_snapshot().await.map(|s| s.tvl * percentage),
            pending_fees: pending_fees(
                share.share_units,
                fee_per_share,
                share.fee_checkpoint,
                share.accrued_fees,
            ),
        })
    }

    async fn state(&self, kind: TxKind) -> Result<PoolState, ActionError> {
        match self.book.read_pool(&self.pool).await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Err(self.reject(kind, ActionError::UnknownPool(self.pool.clone()))),
            Err(e) => Err(self.reject(kind, e)),
        }
    }

    fn reject(&self, kind: TxKind, err: impl Into<ActionError>) -> ActionError {
        self.executor.reject(kind, err.into())
    }

    fn instruction(
        &self,
        kind: TxKind,
        holder: &HolderId,
        summary: &str,
        mut params: serde_json::Value,
    ) -> UnsignedTransaction {
        params["pool"] = json!(self.pool);
        UnsignedTransaction::Instruction(ActionInstruction {
            kind,
            holder: holder.clone(),
            summary: summary.to_string(),
            params,
        })
    }
}
