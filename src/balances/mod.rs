//! Balance Aggregation Module
//!
//! Balance normalization across UTXO, native EVM and token accounts, and
//! the exact decimal conversions everything else builds on.

pub mod aggregator;
pub mod units;

pub use aggregator::*;
pub use units::{from_minor_units, to_minor_units, UnitError};
