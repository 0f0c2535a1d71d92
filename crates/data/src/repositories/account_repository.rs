//! Account store backed by PostgreSQL JSONB documents.

use crate::error::StoreError;
use crate::store::AccountStore;
use async_trait::async_trait;
use aurum_domain::entities::{HolderAccount, HolderId, PoolId, PoolState};
use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres, Row};
use std::sync::Arc;
use tracing::debug;

/// [`AccountStore`] over the `holder_accounts` and `pool_states` tables.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: Arc<PgPool>,
}

impl PgAccountStore {
    /// Creates a new PgAccountStore.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

async fn upsert_account<'e, E>(executor: E, account: &HolderAccount) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO holder_accounts (holder, document, created_at, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (holder) DO UPDATE SET
            document = EXCLUDED.document,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(account.holder.as_str())
    .bind(Json(account))
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

async fn upsert_pool<'e, E>(executor: E, state: &PoolState) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO pool_states (pool, document)
        VALUES ($1, $2)
        ON CONFLICT (pool) DO UPDATE SET
            document = EXCLUDED.document,
            updated_at = NOW()
        "#,
    )
    .bind(state.pool.as_str())
    .bind(Json(state))
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn load_account(&self, holder: &HolderId) -> Result<Option<HolderAccount>, StoreError> {
        let row = sqlx::query("SELECT document FROM holder_accounts WHERE holder = $1")
            .bind(holder.as_str())
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.map(|row| row.try_get::<Json<HolderAccount>, _>("document").map(|doc| doc.0))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn save_account(&self, account: &HolderAccount) -> Result<(), StoreError> {
        upsert_account(self.pool.as_ref(), account).await?;
        debug!(holder = %account.holder, "Account saved");
        Ok(())
    }

    async fn load_pool(&self, pool: &PoolId) -> Result<Option<PoolState>, StoreError> {
        let row = sqlx::query("SELECT document FROM pool_states WHERE pool = $1")
            .bind(pool.as_str())
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.map(|row| row.try_get::<Json<PoolState>, _>("document").map(|doc| doc.0))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn save_pool(&self, state: &PoolState) -> Result<(), StoreError> {
        upsert_pool(self.pool.as_ref(), state).await?;
        debug!(pool = %state.pool, "Pool state saved");
        Ok(())
    }

    async fn save_batch(&self, accounts: &[HolderAccount], pools: &[PoolState]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for account in accounts {
            upsert_account(&mut *tx, account).await?;
        }
        for state in pools {
            upsert_pool(&mut *tx, state).await?;
        }
        tx.commit().await?;
        debug!(accounts = accounts.len(), pools = pools.len(), "Batch saved");
        Ok(())
    }
}
