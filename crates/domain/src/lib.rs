//! Domain model for the Aurum account core.
//!
//! This crate holds the types and pure math shared by every other crate:
//! - Holder accounts, balances, stake positions and pool shares
//! - Swap routes and transaction records
//! - Reward, pool-share, price-impact and constant-product math
//! - The action error taxonomy
//! - A clock abstraction for time-dependent accounting

/// Prelude module for convenient imports.
pub mod prelude;

/// Clock abstraction.
pub mod clock;
/// Domain entities.
pub mod entities;
/// Action error taxonomy.
pub mod error;
/// Pure accounting math.
pub mod math;
/// Value objects.
pub mod value_objects;
