//! Fee Estimation Module
//!
//! Fee-per-kilobyte handling for UTXO coins and gas pricing for
//! Ethereum-family coins.

mod estimator;

pub use estimator::*;
