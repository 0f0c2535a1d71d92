//! Persisted Account Store for the Aurum account core.
//!
//! Holder accounts and pool state are stored as typed documents behind the
//! [`store::AccountStore`] trait. Backends:
//! - [`memory::MemoryAccountStore`] for tests and ephemeral sessions
//! - [`json_file::JsonFileAccountStore`], one JSON file per key
//! - [`repositories::PgAccountStore`], PostgreSQL JSONB documents
//!
//! [`book::AccountBook`] layers per-holder and per-pool critical sections on
//! top of any store.

/// Per-key critical sections over a store.
pub mod book;
/// Store errors.
pub mod error;
/// JSON file backend.
pub mod json_file;
/// In-memory backend.
pub mod memory;
/// PostgreSQL backend.
pub mod repositories;
/// Store trait.
pub mod store;

pub use book::{AccountBook, AccountGuard, PoolGuard};
pub use error::StoreError;
pub use json_file::JsonFileAccountStore;
pub use memory::MemoryAccountStore;
pub use repositories::{Database, PgAccountStore};
pub use store::AccountStore;
