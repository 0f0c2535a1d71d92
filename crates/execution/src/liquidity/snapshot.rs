//! Periodically refreshed pool statistics.

use crate::notify::{Notification, NotificationSink};
use async_trait::async_trait;
use aurum_data::AccountBook;
use aurum_domain::clock::Clock;
use aurum_domain::entities::{PoolId, PoolSnapshot};
use aurum_domain::math::constant_product::tvl_in_token_a;
use aurum_domain::math::pool_metrics::{calculate_apy, calculate_pool_fees};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("pool {0} is not registered")]
    UnknownPool(PoolId),
    #[error("pool stats unavailable: {0}")]
    Unavailable(String),
}

/// Source of pool-wide statistics.
#[async_trait]
pub trait PoolStatsSource: Send + Sync {
    async fn pool_stats(&self, pool: &PoolId) -> Result<PoolSnapshot, SnapshotError>;
}

/// Stats derived from the pool's own reserves.
///
/// TVL is valued in the base token at the pool's spot price. Fees come from
/// a configured 24 h volume and fee tier; APY annualises one day of fees
/// over TVL.
pub struct ReservePoolStats {
    book: Arc<AccountBook>,
    volume_24h: Decimal,
    fee_bps: u32,
}

impl ReservePoolStats {
    /// Creates a new ReservePoolStats.
    pub fn new(book: Arc<AccountBook>, volume_24h: Decimal, fee_bps: u32) -> Self {
        Self {
            book,
            volume_24h,
            fee_bps,
        }
    }
}

#[async_trait]
impl PoolStatsSource for ReservePoolStats {
    async fn pool_stats(&self, pool: &PoolId) -> Result<PoolSnapshot, SnapshotError> {
        let state = self
            .book
            .read_pool(pool)
            .await
            .map_err(|e| SnapshotError::Unavailable(e.to_string()))?
            .ok_or_else(|| SnapshotError::UnknownPool(pool.clone()))?;

        let tvl = tvl_in_token_a(state.reserve_a, state.reserve_b);
        let fees_24h = calculate_pool_fees(self.volume_24h, self.fee_bps);
        let apy = calculate_apy(fees_24h, tvl, 1).unwrap_or(Decimal::ZERO);

        Ok(PoolSnapshot {
            pool: pool.clone(),
            tvl,
            volume_24h: self.volume_24h,
            fees_24h,
            apy,
            reserve_a: state.reserve_a,
            reserve_b: state.reserve_b,
            taken_at: self.book.clock().now(),
        })
    }
}

/// Freshness of the displayed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Fresh,
    /// Older than the staleness window, or never taken.
    Stale,
    /// The most recent refresh failed; the previous snapshot is kept.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotView {
    pub snapshot: Option<PoolSnapshot>,
    pub status: SnapshotStatus,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct SnapshotState {
    snapshot: Option<PoolSnapshot>,
    refreshed_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Keeps the latest snapshot of one pool.
pub struct PoolSnapshotService {
    pool: PoolId,
    source: Arc<dyn PoolStatsSource>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
    stale_after: chrono::Duration,
    state: RwLock<SnapshotState>,
}

impl PoolSnapshotService {
    /// Creates a new PoolSnapshotService.
    pub fn new(
        pool: PoolId,
        source: Arc<dyn PoolStatsSource>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
        stale_after: chrono::Duration,
    ) -> Self {
        Self {
            pool,
            source,
            clock,
            notifier,
            stale_after,
            state: RwLock::new(SnapshotState::default()),
        }
    }

    pub fn pool(&self) -> &PoolId {
        &self.pool
    }

    /// Fetches a new snapshot.
    ///
    /// # Errors
    /// Returns the source error; the previous snapshot stays visible and the
    /// view reports [`SnapshotStatus::Failed`].
    pub async fn refresh(&self) -> Result<PoolSnapshot, SnapshotError> {
        match self.source.pool_stats(&self.pool).await {
            Ok(snapshot) => {
                let mut state = self.state.write().await;
                state.snapshot = Some(snapshot.clone());
                state.refreshed_at = Some(self.clock.now());
                state.last_error = None;
                debug!(pool = %self.pool, tvl = %snapshot.tvl, apy = %snapshot.apy, "Pool snapshot refreshed");
                Ok(snapshot)
            }
            Err(e) => {
                warn!(pool = %self.pool, error = %e, "Pool snapshot refresh failed");
                self.state.write().await.last_error = Some(e.to_string());
                self.notifier
                    .notify(Notification::warning("pool-snapshot", e.to_string()));
                Err(e)
            }
        }
    }

    /// Latest snapshot, if any was taken.
    pub async fn latest(&self) -> Option<PoolSnapshot> {
        self.state.read().await.snapshot.clone()
    }

    pub async fn view(&self) -> SnapshotView {
        let state = self.state.read().await;
        let status = if state.last_error.is_some() {
            SnapshotStatus::Failed
        } else {
            match state.refreshed_at {
                Some(at) if self.clock.now() - at <= self.stale_after => SnapshotStatus::Fresh,
                _ => SnapshotStatus::Stale,
            }
        };
        SnapshotView {
            snapshot: state.snapshot.clone(),
            status,
            refreshed_at: state.refreshed_at,
            last_error: state.last_error.clone(),
        }
    }
}
