//! External collaborators of the Aurum account core.
//!
//! Two seams live here:
//! - [`signer::TransactionSigner`], the wallet that signs, broadcasts and
//!   confirms transactions
//! - [`aggregator::QuoteAggregator`], the swap quote source, with a
//!   [`jupiter::JupiterClient`] implementation over HTTP
//!
//! The `testing` module, behind the `testing` feature, provides scripted
//! doubles of both for use in tests.

/// Quote aggregator seam.
pub mod aggregator;
/// Jupiter aggregator HTTP client.
pub mod jupiter;
/// Signer and broadcaster seam.
pub mod signer;
/// Scripted test doubles.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregator::{AggregatorError, QuoteAggregator, QuoteRequest};
pub use signer::{ActionInstruction, SignedTransaction, SignerError, TransactionSigner, UnsignedTransaction};
