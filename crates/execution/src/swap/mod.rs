//! Swap quotes and execution through a quote aggregator.

mod router;

pub use router::*;
