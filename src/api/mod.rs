//! External Service Contracts
//!
//! The core reads chain state through two services: a block-data service
//! (balances, spendable outputs, fee estimates, broadcast) and a gas-price
//! oracle. Both are traits so tests and alternative backends can stand in
//! for the HTTP implementations.

pub mod blockbook;
pub mod gas_oracle;

pub use blockbook::BlockbookClient;
pub use gas_oracle::GasStationOracle;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{WalletError, WalletResult};
use crate::fees::FeeQuote;
use crate::types::{GasQuote, Utxo};

/// What an account query is keyed by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountId {
    /// Account-level extended public key of a UTXO coin
    ExtendedKey(String),
    /// A single Ethereum-family address
    Address(String),
}

/// A token sub-balance of an Ethereum-family account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub contract: String,
    /// Minor units of the token
    pub balance: u128,
    pub decimals: u32,
}

/// Account state as reported by the block-data service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Confirmed balance in minor units
    pub balance: u128,
    /// Pending delta in minor units, negative while spends are unconfirmed
    pub unconfirmed_balance: i128,
    pub used_address_count: u32,
    pub nonce: Option<u64>,
    pub tokens: Vec<TokenBalance>,
}

impl AccountInfo {
    /// Token entry for a contract, matched case-insensitively
    pub fn token(&self, contract: &str) -> Option<&TokenBalance> {
        self.tokens
            .iter()
            .find(|token| token.contract.eq_ignore_ascii_case(contract.trim()))
    }
}

/// Chain-state queries and broadcast for one coin
pub trait BlockDataService: Send + Sync {
    fn account_info(&self, account: &AccountId) -> WalletResult<AccountInfo>;

    fn spendable_outputs(&self, xpub: &str) -> WalletResult<Vec<Utxo>>;

    fn fee_estimate(&self, confirmation_target: u32) -> WalletResult<FeeQuote>;

    /// Submit a signed transaction, returning its id
    fn broadcast(&self, raw_hex: &str) -> WalletResult<String>;
}

/// Gas-price snapshot provider
pub trait GasPriceOracle: Send + Sync {
    fn quote(&self) -> WalletResult<GasQuote>;
}

/// Block-data services keyed by coin tag
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn BlockDataService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, coin: impl Into<String>, service: Arc<dyn BlockDataService>) {
        self.services.insert(coin.into().to_uppercase(), service);
    }

    pub fn with(mut self, coin: impl Into<String>, service: Arc<dyn BlockDataService>) -> Self {
        self.insert(coin, service);
        self
    }

    pub fn get(&self, coin: &str) -> WalletResult<Arc<dyn BlockDataService>> {
        self.services
            .get(&coin.to_uppercase())
            .cloned()
            .ok_or_else(|| WalletError::configuration(format!("No block-data service for {}", coin)))
    }
}
