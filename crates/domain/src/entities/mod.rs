pub mod account;
pub mod balance;
pub mod holder;
pub mod pool;
pub mod route;
pub mod stake;
pub mod token;
pub mod transaction;

// Re-export for easier access
pub use account::HolderAccount;
pub use balance::BalanceSnapshot;
pub use holder::HolderId;
pub use pool::{PoolId, PoolPosition, PoolShare, PoolSnapshot, PoolState};
pub use route::SwapRoute;
pub use stake::{StakePosition, StakeView};
pub use token::Token;
pub use transaction::{TransactionRecord, TransitionError, TxKind, TxStatus};
