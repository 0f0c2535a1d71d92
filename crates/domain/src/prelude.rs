//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use aurum_domain::prelude::*;
//! ```

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::entities::{
    BalanceSnapshot, HolderAccount, HolderId, PoolId, PoolPosition, PoolShare, PoolSnapshot,
    PoolState, StakePosition, StakeView, SwapRoute, Token, TransactionRecord, TransitionError,
    TxKind, TxStatus,
};
pub use crate::error::{ActionError, ErrorKind};
pub use crate::value_objects::amount::Amount;
