//! Staking: the ledger and the pending-reward ticker.

mod ledger;
mod ticker;

pub use ledger::*;
pub use ticker::*;
