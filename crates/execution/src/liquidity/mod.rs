//! Liquidity pool accounts and pool snapshots.

mod account;
mod snapshot;

pub use account::*;
pub use snapshot::*;
