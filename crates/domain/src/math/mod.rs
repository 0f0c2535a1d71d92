//! Accounting math.
//!
//! All functions are pure and work on `Decimal` quantities.

pub mod constant_product;
pub mod pool_metrics;
pub mod pool_shares;
pub mod price_impact;
pub mod rewards;

/// Seconds in one accrual day.
pub const SECONDS_PER_DAY: i64 = 86_400;
/// Days in one APY year.
pub const DAYS_PER_YEAR: u32 = 365;
/// Basis points in 100 %.
pub const BPS_DENOMINATOR: u32 = 10_000;
