//! Shared types for the wallet core
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

// =============================================================================
// Coin Profiles
// =============================================================================

/// BIP44 coin type shared by every Ethereum-family account
pub const EVM_COIN_TYPE: u32 = 60;

/// Decimal count of the native Ethereum-family coin
pub const EVM_NATIVE_DECIMALS: u32 = 18;

/// Hash primitive a UTXO coin signs its legacy sighash preimage with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SighashAlgorithm {
    /// Double SHA-256 (Bitcoin and most forks)
    #[default]
    Sha256d,
    /// Single SHA-256 (Groestlcoin-style chains)
    Sha256,
}

/// Immutable network parameters of a UTXO-model coin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoParams {
    pub coin_type: u32,
    #[serde(default = "default_purpose")]
    pub purpose: u32,
    pub p2pkh_version: u8,
    pub p2sh_version: u8,
    /// Only used to decode native segwit payees
    #[serde(default)]
    pub bech32_hrp: Option<String>,
    #[serde(default = "default_xpub_version")]
    pub xpub_version: u32,
    #[serde(default)]
    pub sighash: SighashAlgorithm,
    #[serde(default = "default_tx_version")]
    pub tx_version: i32,
    #[serde(default = "default_utxo_decimals")]
    pub decimals: u32,
    #[serde(default = "default_fee_target")]
    pub fee_target: u32,
    #[serde(default = "default_fallback_fee")]
    pub fallback_fee_per_kb: u64,
}

impl UtxoParams {
    /// Bitcoin mainnet parameters, used as the base for most forks
    pub fn bitcoin() -> Self {
        Self {
            coin_type: 0,
            purpose: default_purpose(),
            p2pkh_version: 0x00,
            p2sh_version: 0x05,
            bech32_hrp: Some("bc".to_string()),
            xpub_version: default_xpub_version(),
            sighash: SighashAlgorithm::Sha256d,
            tx_version: default_tx_version(),
            decimals: default_utxo_decimals(),
            fee_target: 4,
            fallback_fee_per_kb: default_fallback_fee(),
        }
    }
}

/// Immutable network parameters of a native Ethereum-family coin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmParams {
    pub chain_id: u64,
    #[serde(default = "default_native_gas_limit")]
    pub native_gas_limit: u64,
    #[serde(default = "default_token_gas_limit")]
    pub token_gas_limit: u64,
}

impl EvmParams {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            native_gas_limit: default_native_gas_limit(),
            token_gas_limit: default_token_gas_limit(),
        }
    }
}

/// A token contract living on an Ethereum-family parent coin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenParams {
    /// Tag of the native coin whose account holds the token
    pub parent: String,
    pub contract: String,
    pub decimals: u32,
}

/// Closed set of accounting models a coin can follow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoinKind {
    #[serde(rename = "utxo")]
    UtxoCoin(UtxoParams),
    #[serde(rename = "native_evm")]
    NativeEvmCoin(EvmParams),
    #[serde(rename = "evm_token")]
    EvmToken(TokenParams),
}

impl CoinKind {
    /// BIP44 coin type used for the account path
    pub fn coin_type(&self) -> u32 {
        match self {
            CoinKind::UtxoCoin(params) => params.coin_type,
            CoinKind::NativeEvmCoin(_) | CoinKind::EvmToken(_) => EVM_COIN_TYPE,
        }
    }

    pub fn is_utxo(&self) -> bool {
        matches!(self, CoinKind::UtxoCoin(_))
    }

    pub fn is_token(&self) -> bool {
        matches!(self, CoinKind::EvmToken(_))
    }
}

/// Balance threshold above which the sweep moves funds to cold storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPolicy {
    pub threshold: Decimal,
    #[serde(default)]
    pub reserve: Decimal,
}

/// Everything the core needs to know about one coin
#[derive(Debug)]
pub struct CoinProfile {
    pub tag: String,
    pub name: String,
    pub kind: CoinKind,
    pub mnemonic: SecretString,
    /// Base URL of the block-data service
    pub endpoint: String,
    pub cold_address: Option<String>,
    pub sweep: Option<SweepPolicy>,
}

impl CoinProfile {
    pub fn new(
        tag: impl Into<String>,
        kind: CoinKind,
        mnemonic: SecretString,
        endpoint: impl Into<String>,
    ) -> Self {
        let tag = tag.into().to_uppercase();
        Self {
            name: tag.clone(),
            tag,
            kind,
            mnemonic,
            endpoint: endpoint.into(),
            cold_address: None,
            sweep: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cold_address(mut self, address: impl Into<String>) -> Self {
        self.cold_address = Some(address.into());
        self
    }

    pub fn with_sweep(mut self, policy: SweepPolicy) -> Self {
        self.sweep = Some(policy);
        self
    }

    pub fn utxo_params(&self) -> Option<&UtxoParams> {
        match &self.kind {
            CoinKind::UtxoCoin(params) => Some(params),
            _ => None,
        }
    }
}

// =============================================================================
// Address Tracking
// =============================================================================

/// An address issued or pre-derived for a coin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: String,
    pub index: u32,
    pub coin: String,
}

/// Per-coin issuance state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrInfo {
    pub last_used: u32,
    pub records: Vec<AddressRecord>,
}

// =============================================================================
// Chain Data
// =============================================================================

/// A spendable output of the hot wallet's account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    /// Minor units
    pub value: u64,
    pub address: String,
    /// HD path as reported by the block-data service, e.g. `m/44'/0'/0'/0/7`
    pub path: String,
}

/// Gas price tiers in gwei
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasQuote {
    pub average: Decimal,
    pub fast: Decimal,
    pub fastest: Decimal,
}

/// Normalized balance in whole coin units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    pub confirmed: Decimal,
    pub unconfirmed: Decimal,
}

// =============================================================================
// Sending
// =============================================================================

/// An outgoing payment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub address: String,
    /// Whole coin units
    pub amount: Decimal,
    /// Identifier of the calling service, selects caller-scoped wallets
    #[serde(default)]
    pub caller: Option<String>,
}

impl SendRequest {
    pub fn new(address: impl Into<String>, amount: Decimal) -> Self {
        Self {
            address: address.into(),
            amount,
            caller: None,
        }
    }

    pub fn from_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }
}

/// A signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub coin: String,
    /// Hex exactly as it is handed to the block-data service
    pub raw_hex: String,
    /// Transaction id computed locally from the signed bytes
    pub local_txid: String,
    /// Fee in minor units, when it is known before broadcast
    pub fee: Option<u64>,
}

/// Result of a successful send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub txid: String,
    pub raw_hex: String,
}

// =============================================================================
// Validation
// =============================================================================

/// How a caller expresses the expected amount of a raw transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountConvention {
    /// Already in the coin's (or token's) minor units
    #[default]
    MinorUnits,
    /// Eight implied decimals regardless of the coin's own decimal count
    SatoshiScaled,
}

/// Independent verdicts of a raw transaction check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub value_matches: bool,
    pub address_matches: bool,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.value_matches && self.address_matches
    }
}

// =============================================================================
// Serde defaults
// =============================================================================

fn default_purpose() -> u32 {
    44
}

fn default_xpub_version() -> u32 {
    0x0488_B21E
}

fn default_tx_version() -> i32 {
    1
}

fn default_utxo_decimals() -> u32 {
    8
}

fn default_fee_target() -> u32 {
    2
}

fn default_fallback_fee() -> u64 {
    4000
}

fn default_native_gas_limit() -> u64 {
    21_000
}

fn default_token_gas_limit() -> u64 {
    200_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_kind_is_internally_tagged() {
        let kind: CoinKind = toml::from_str(
            r#"
            type = "utxo"
            coin_type = 2
            p2pkh_version = 48
            p2sh_version = 50
            "#,
        )
        .unwrap();

        match kind {
            CoinKind::UtxoCoin(params) => {
                assert_eq!(params.coin_type, 2);
                assert_eq!(params.purpose, 44);
                assert_eq!(params.tx_version, 1);
                assert_eq!(params.fallback_fee_per_kb, 4000);
                assert_eq!(params.sighash, SighashAlgorithm::Sha256d);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn token_kind_uses_evm_coin_type() {
        let kind = CoinKind::EvmToken(TokenParams {
            parent: "ETH".into(),
            contract: "0xdac17f958d2ee523a2206206994597c13d831ec7".into(),
            decimals: 6,
        });
        assert_eq!(kind.coin_type(), EVM_COIN_TYPE);
        assert!(kind.is_token());
    }

    #[test]
    fn report_requires_both_verdicts() {
        let report = ValidationReport {
            value_matches: true,
            address_matches: false,
        };
        assert!(!report.is_valid());
    }
}
