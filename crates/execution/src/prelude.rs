//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use aurum_execution::prelude::*;
//! ```

// App
pub use crate::app::{AppBuilder, AppError, AurumApp, LiquidityPoolConfig, open_store};

// Config
pub use crate::config::{AppConfig, ConfigError, Network, StakingPolicy};

// Lifecycle
pub use crate::lifecycle::{
    Executed, LifecyclePhase, PhaseBoard, PhaseError, PhaseUpdate, TransactionExecutor, TransactionHistory,
    TransactionLifecycle,
};

// Liquidity
pub use crate::liquidity::{
    PoolAccountService, PoolSnapshotService, PoolStatsSource, ReservePoolStats, SnapshotError,
    SnapshotStatus, SnapshotView,
};

// Notifications
pub use crate::notify::{ChannelSink, MultiSink, Notification, NotificationSink, Severity, TracingSink};

// Runtime
pub use crate::runtime::{BackgroundHandle, BackgroundTasks};

// Scheduler
pub use crate::scheduler::{Schedule, ScheduleBuilder, ScheduledTask, Scheduler, StopHandle, TaskEvent};

// Staking
pub use crate::staking::{RewardBoard, RewardTicker, StakingLedger};

// Swap
pub use crate::swap::{QuoteOutcome, SwapRouter};

// Transfer
pub use crate::transfer::TransferService;

// Wallet
pub use crate::wallet::WalletSession;
