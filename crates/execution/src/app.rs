//! Wiring of the account core from configuration.

use crate::config::AppConfig;
use crate::lifecycle::{TransactionExecutor, TransactionHistory};
use crate::liquidity::{PoolAccountService, PoolSnapshotService, ReservePoolStats};
use crate::notify::{NotificationSink, TracingSink};
use crate::runtime::{BackgroundHandle, BackgroundTasks};
use crate::staking::{RewardTicker, StakingLedger};
use crate::swap::SwapRouter;
use crate::transfer::TransferService;
use crate::wallet::WalletSession;
use aurum_data::{AccountBook, AccountStore, Database, JsonFileAccountStore, MemoryAccountStore, StoreError};
use aurum_domain::clock::{Clock, SystemClock};
use aurum_domain::entities::{PoolId, PoolState};
use aurum_protocols::aggregator::QuoteAggregator;
use aurum_protocols::jupiter::JupiterClient;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("aggregator client: {0}")]
    Aggregator(String),
}

/// Opens the store selected by the configuration: PostgreSQL when a
/// database URL is set, else JSON files when a data directory is set, else
/// memory.
///
/// # Errors
/// Returns an error if the backend cannot be opened or migrated.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn AccountStore>, StoreError> {
    if let Some(url) = &config.database_url {
        let db = Database::connect(url).await?;
        db.migrate().await?;
        info!("Using PostgreSQL account store");
        return Ok(Arc::new(db.accounts()));
    }
    if let Some(dir) = &config.data_dir {
        info!(dir = %dir, "Using JSON file account store");
        return Ok(Arc::new(JsonFileAccountStore::open(dir).await?));
    }
    info!("Using in-memory account store");
    Ok(Arc::new(MemoryAccountStore::new()))
}

/// A liquidity pool to register at startup.
#[derive(Debug, Clone)]
pub struct LiquidityPoolConfig {
    pub state: PoolState,
    pub volume_24h: Decimal,
    pub fee_bps: u32,
}

/// Builds an [`AurumApp`].
pub struct AppBuilder {
    config: AppConfig,
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
    aggregator: Option<Arc<dyn QuoteAggregator>>,
    staking_pools: Vec<(PoolId, String)>,
    liquidity_pools: Vec<LiquidityPoolConfig>,
}

impl AppBuilder {
    /// Creates a new AppBuilder with the system clock and tracing notifications.
    pub fn new(config: AppConfig, store: Arc<dyn AccountStore>) -> Self {
        Self {
            config,
            store,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(TracingSink),
            aggregator: None,
            staking_pools: Vec::new(),
            liquidity_pools: Vec::new(),
        }
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Uses `aggregator` instead of a Jupiter client at the configured URL.
    #[must_use]
    pub fn aggregator(mut self, aggregator: Arc<dyn QuoteAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    #[must_use]
    pub fn staking_pool(mut self, pool: PoolId, token: impl Into<String>) -> Self {
        self.staking_pools.push((pool, token.into()));
        self
    }

    #[must_use]
    pub fn liquidity_pool(mut self, pool: LiquidityPoolConfig) -> Self {
        self.liquidity_pools.push(pool);
        self
    }

    /// Registers the pools and wires the services.
    ///
    /// # Errors
    /// Returns an error if a pool cannot be registered or the aggregator
    /// client cannot be built.
    pub async fn build(self) -> Result<AurumApp, AppError> {
        let book = Arc::new(AccountBook::new(self.store, Arc::clone(&self.clock)));
        let session = Arc::new(WalletSession::new());
        let executor = Arc::new(TransactionExecutor::new(
            Arc::clone(&session),
            Arc::new(TransactionHistory::new(self.config.history_capacity)),
            Arc::clone(&self.clock),
            Arc::clone(&self.notifier),
            self.config.cooldown_period(),
        ));

        let aggregator = match self.aggregator {
            Some(aggregator) => aggregator,
            None => Arc::new(
                JupiterClient::new(&self.config.aggregator_base_url)
                    .map_err(|e| AppError::Aggregator(e.to_string()))?,
            ),
        };

        let mut staking = StakingLedger::new(
            Arc::clone(&book),
            Arc::clone(&executor),
            self.config.staking_policy(),
        );
        for (pool, token) in self.staking_pools {
            staking = staking.with_pool(pool, token);
        }
        let staking = Arc::new(staking);
        let ticker = Arc::new(RewardTicker::new(Arc::clone(&staking)));

        // one missed refresh is tolerated before the snapshot shows as stale
        let stale_after = i64::try_from(self.config.pool_refresh_interval_secs.saturating_mul(2))
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);
        let mut background = BackgroundTasks::new().with_ticker(Arc::clone(&ticker));
        let mut pools = BTreeMap::new();
        for pool_config in self.liquidity_pools {
            let state = book.register_pool(pool_config.state).await?;
            let snapshots = Arc::new(PoolSnapshotService::new(
                state.pool.clone(),
                Arc::new(ReservePoolStats::new(Arc::clone(&book), pool_config.volume_24h, pool_config.fee_bps)),
                Arc::clone(&self.clock),
                Arc::clone(&self.notifier),
                stale_after,
            ));
            background = background.with_snapshots(Arc::clone(&snapshots));
            let service = PoolAccountService::new(state.pool.clone(), Arc::clone(&book), Arc::clone(&executor))
                .with_snapshots(snapshots);
            pools.insert(state.pool, Arc::new(service));
        }

        info!(
            network = %self.config.network,
            apy = %self.config.apy(),
            liquidity_pools = pools.len(),
            "Account core ready"
        );

        Ok(AurumApp {
            router: Arc::new(SwapRouter::new(aggregator, Arc::clone(&executor))),
            transfers: Arc::new(TransferService::new(Arc::clone(&book), Arc::clone(&executor))),
            config: self.config,
            book,
            session,
            executor,
            staking,
            ticker,
            pools,
            background: Arc::new(background),
        })
    }
}

/// The wired account core.
pub struct AurumApp {
    pub config: AppConfig,
    pub book: Arc<AccountBook>,
    pub session: Arc<WalletSession>,
    pub executor: Arc<TransactionExecutor>,
    pub staking: Arc<StakingLedger>,
    pub ticker: Arc<RewardTicker>,
    pub pools: BTreeMap<PoolId, Arc<PoolAccountService>>,
    pub router: Arc<SwapRouter>,
    pub transfers: Arc<TransferService>,
    background: Arc<BackgroundTasks>,
}

impl AurumApp {
    pub fn pool(&self, pool: &PoolId) -> Option<&Arc<PoolAccountService>> {
        self.pools.get(pool)
    }

    /// Starts pool snapshot and reward refreshes on the configured intervals.
    pub fn start_background(&self) -> BackgroundHandle {
        let scheduler = self.background.scheduler(&self.config);
        Arc::clone(&self.background).spawn(scheduler)
    }
}
