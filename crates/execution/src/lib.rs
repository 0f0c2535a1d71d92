//! Account core of the Aurum token dashboard.
//!
//! This crate provides the user-facing actions and their bookkeeping:
//! - Staking ledger with simple daily rewards and a minimum lock
//! - Liquidity pool accounts with share units and fee accrual
//! - Swap quote routing with stale-response protection
//! - Transfers between holders
//! - Transaction lifecycle tracking for every on-chain action
//! - Background refresh of pool snapshots and pending rewards

/// Prelude module for convenient imports.
pub mod prelude;

/// Wiring from configuration.
pub mod app;
/// Configuration.
pub mod config;
/// Transaction lifecycle and execution.
pub mod lifecycle;
/// Liquidity pool accounts and snapshots.
pub mod liquidity;
/// User notifications.
pub mod notify;
/// Background refresh tasks.
pub mod runtime;
/// Scheduler for background timing.
pub mod scheduler;
/// Staking ledger and reward ticker.
pub mod staking;
/// Swap quote routing.
pub mod swap;
/// Tracing setup.
pub mod telemetry;
/// Test harness and doubles.
#[cfg(any(test, feature = "testing"))]
pub mod testing;
/// Token transfers.
pub mod transfer;
/// Wallet session.
pub mod wallet;
