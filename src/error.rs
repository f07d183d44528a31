//! Unified error types for the wallet core
//!
//! Every component returns `WalletResult`. Errors are serializable so an
//! outer API layer can hand them back to callers unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all wallet operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl WalletError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Configuration, msg)
    }

    pub fn derivation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Derivation, msg)
    }

    pub fn data_service(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::DataService, msg)
    }

    pub fn insufficient_balance(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientBalance, msg)
    }

    pub fn no_balance(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoBalanceAvailable, msg)
    }

    pub fn gas_price_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::GasPriceUnavailable, msg)
    }

    pub fn broadcast(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Broadcast, msg)
    }

    pub fn tx_build(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransactionBuild, msg)
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Serialization, msg)
    }

    pub fn validation_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationMismatch, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn signer_not_ready(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignerNotReady, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for WalletError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Setup
    Configuration,
    Derivation,
    SignerNotReady,

    // External services
    DataService,
    GasPriceUnavailable,
    Broadcast,

    // Funds
    InsufficientBalance,
    NoBalanceAvailable,

    // Transactions
    TransactionBuild,
    Serialization,
    ValidationMismatch,

    // Input / internal
    InvalidInput,
    Internal,
}

/// Result type alias for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

// Conversions from common error types

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::new(ErrorCode::DataService, format!("Malformed JSON: {}", e))
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(e: hex::FromHexError) -> Self {
        WalletError::new(ErrorCode::Serialization, format!("Hex error: {}", e))
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WalletError::data_service("Request timed out")
        } else if e.is_connect() {
            WalletError::data_service("Connection failed")
        } else {
            WalletError::data_service(e.to_string())
        }
    }
}

impl From<bitcoin::bip32::Error> for WalletError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        WalletError::derivation(format!("BIP32 error: {}", e))
    }
}

impl From<bitcoin::secp256k1::Error> for WalletError {
    fn from(e: bitcoin::secp256k1::Error) -> Self {
        WalletError::derivation(format!("Secp256k1 error: {}", e))
    }
}

impl From<bip39::Error> for WalletError {
    fn from(e: bip39::Error) -> Self {
        WalletError::configuration(format!("BIP39 error: {}", e))
    }
}

impl From<bitcoin::consensus::encode::Error> for WalletError {
    fn from(e: bitcoin::consensus::encode::Error) -> Self {
        WalletError::serialization(format!("Transaction decode failed: {}", e))
    }
}

impl From<toml::de::Error> for WalletError {
    fn from(e: toml::de::Error) -> Self {
        WalletError::configuration(format!("Invalid configuration file: {}", e))
    }
}

impl From<url::ParseError> for WalletError {
    fn from(e: url::ParseError) -> Self {
        WalletError::configuration(format!("Invalid endpoint URL: {}", e))
    }
}

impl From<ethers_signers::WalletError> for WalletError {
    fn from(e: ethers_signers::WalletError) -> Self {
        WalletError::derivation(format!("Signer error: {}", e))
    }
}

impl From<ethers_core::utils::rlp::DecoderError> for WalletError {
    fn from(e: ethers_core::utils::rlp::DecoderError) -> Self {
        WalletError::serialization(format!("RLP decode failed: {}", e))
    }
}

impl From<std::io::Error> for WalletError {
    fn from(e: std::io::Error) -> Self {
        WalletError::internal(e.to_string())
    }
}
