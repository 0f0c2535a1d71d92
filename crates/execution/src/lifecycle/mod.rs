//! Transaction lifecycle tracking.
//!
//! Every user action runs through one [`TransactionLifecycle`]:
//! `idle → preparing → signing → confirming → success | error`, with the
//! terminal phase reset to idle after the cooldown. The
//! [`TransactionExecutor`] drives lifecycles against the connected signer and
//! records outcomes in the [`TransactionHistory`].

mod executor;
mod history;
mod machine;

pub use executor::*;
pub use history::*;
pub use machine::*;
