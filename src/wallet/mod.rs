//! Wallet Module
//!
//! Handles key derivation, per-coin address encoding, address issuance
//! and the Ethereum-family signer cache.

pub mod address;
mod derivation;
pub mod keys;
mod pool;

pub use derivation::*;
pub use keys::{SignerCache, SignerKey};
pub use pool::*;
