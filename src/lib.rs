//! Hot Wallet Core Library
//!
//! Custodial hot-wallet backend for UTXO coins and Ethereum-family coins
//! with their ERC20 tokens.
//!
//! # Architecture
//!
//! This crate provides:
//! - **wallet**: HD key derivation, address issuance and the signer cache
//! - **balances**: Balance aggregation and unit conversion
//! - **fees**: Fee-rate parsing, size estimation and gas pricing
//! - **tx**: Transaction building, signing, broadcasting and raw-tx validation
//! - **api**: Block-data service and gas-price oracle clients
//! - **config**: TOML configuration with secrets resolved from the environment
//! - **hot_wallet**: The facade every caller goes through
//! - **sweep**: Periodic transfer of surplus funds to deposit addresses
//!
//! # Security
//!
//! Mnemonics and the seed passphrase are held as `secrecy::SecretString` and
//! seeds are wrapped in `zeroize::Zeroizing`, so they are cleared on drop.
//! Nothing secret is ever logged.
//!
//! # Example
//!
//! ```rust,ignore
//! use hotwallet_core::{HotWallet, SendRequest, WalletConfig};
//!
//! let wallet = HotWallet::from_config(WalletConfig::from_file("wallet.toml")?)?;
//! wallet.startup_scan();
//! let address = wallet.get_address("BTC", None)?;
//! let outcome = wallet.send("ETH", &SendRequest::new("0x...", amount))?;
//! ```

pub mod api;
pub mod balances;
pub mod config;
pub mod error;
pub mod fees;
pub mod hot_wallet;
pub mod sweep;
pub mod tx;
pub mod types;
pub mod utils;
pub mod wallet;

pub use config::WalletConfig;
pub use error::{ErrorCode, WalletError, WalletResult};
pub use hot_wallet::{HotWallet, ScanOutcome};
pub use sweep::{run_sweep, ColdStorageAddresses, DepositAddressSource, SweepReport};
pub use types::*;
