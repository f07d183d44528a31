//! Blockbook v2 REST client
//!
//! Blockbook reports amounts as decimal strings in minor units; they are
//! parsed into integers here so the rest of the core never sees wire text.

use serde::Deserialize;
use std::time::Duration;

use super::{AccountId, AccountInfo, BlockDataService, TokenBalance};
use crate::error::{WalletError, WalletResult};
use crate::fees::FeeQuote;
use crate::types::Utxo;
use crate::utils::http::{join_url, HttpClient};
use crate::utils::logging::redact_hash;

/// Block-data service backed by a Blockbook instance
pub struct BlockbookClient {
    base_url: String,
    http: HttpClient,
}

impl BlockbookClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> WalletResult<Self> {
        Ok(Self {
            base_url: base_url.into(),
            http: HttpClient::new(timeout)?,
        })
    }

    pub fn with_client(base_url: impl Into<String>, http: HttpClient) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAccount {
    #[serde(default)]
    balance: Option<String>,
    #[serde(default)]
    unconfirmed_balance: Option<String>,
    #[serde(default)]
    used_tokens: Option<u32>,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    tokens: Vec<WireToken>,
}

#[derive(Debug, Deserialize)]
struct WireToken {
    #[serde(default)]
    contract: Option<String>,
    #[serde(default)]
    balance: Option<String>,
    #[serde(default)]
    decimals: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireUtxo {
    txid: String,
    vout: u32,
    value: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl WireAccount {
    fn into_account_info(self) -> WalletResult<AccountInfo> {
        let tokens = self
            .tokens
            .into_iter()
            .filter_map(|token| {
                let contract = token.contract?;
                Some(parse_u128(token.balance.as_deref().unwrap_or("0"), "token balance").map(
                    |balance| TokenBalance {
                        contract,
                        balance,
                        decimals: token.decimals.unwrap_or(0),
                    },
                ))
            })
            .collect::<WalletResult<Vec<_>>>()?;

        Ok(AccountInfo {
            balance: parse_u128(self.balance.as_deref().unwrap_or("0"), "balance")?,
            unconfirmed_balance: parse_i128(
                self.unconfirmed_balance.as_deref().unwrap_or("0"),
                "unconfirmed balance",
            )?,
            used_address_count: self.used_tokens.unwrap_or(0),
            nonce: self.nonce.as_deref().map(parse_nonce).transpose()?,
            tokens,
        })
    }
}

// =============================================================================
// Service Implementation
// =============================================================================

impl BlockDataService for BlockbookClient {
    fn account_info(&self, account: &AccountId) -> WalletResult<AccountInfo> {
        let path = match account {
            AccountId::ExtendedKey(xpub) => format!("api/v2/xpub/{}?details=basic", xpub),
            AccountId::Address(address) => {
                format!("api/v2/address/{}?details=tokenBalances", address)
            }
        };

        let wire: WireAccount = self.http.get_json(&self.url(&path))?;
        wire.into_account_info()
    }

    fn spendable_outputs(&self, xpub: &str) -> WalletResult<Vec<Utxo>> {
        let wire: Vec<WireUtxo> = self.http.get_json(&self.url(&format!("api/v2/utxo/{}", xpub)))?;

        wire.into_iter()
            .map(|utxo| {
                let value = parse_u128(&utxo.value, "utxo value")?;
                let value = u64::try_from(value)
                    .map_err(|_| WalletError::data_service("UTXO value out of range"))?;
                Ok(Utxo {
                    txid: utxo.txid,
                    vout: utxo.vout,
                    value,
                    address: utxo.address.unwrap_or_default(),
                    path: utxo.path.unwrap_or_default(),
                })
            })
            .collect()
    }

    fn fee_estimate(&self, confirmation_target: u32) -> WalletResult<FeeQuote> {
        let wire: WireResult = self
            .http
            .get_json(&self.url(&format!("api/v2/estimatefee/{}", confirmation_target)))?;
        if let Some(error) = wire.error {
            return Err(WalletError::data_service(format!(
                "Fee estimate failed: {}",
                error_message(&error)
            )));
        }
        FeeQuote::parse(wire.result.as_deref().unwrap_or(""))
    }

    fn broadcast(&self, raw_hex: &str) -> WalletResult<String> {
        let (status, body) = self.http.get_raw(&self.url(&format!("api/v2/sendtx/{}", raw_hex)))?;

        let parsed: Option<WireResult> = serde_json::from_str(&body).ok();
        match parsed {
            Some(WireResult {
                result: Some(txid),
                error: None,
            }) if (200..300).contains(&status) => {
                tracing::debug!(txid = %redact_hash(&txid), "blockbook accepted transaction");
                Ok(txid)
            }
            Some(WireResult { error: Some(error), .. }) => {
                Err(WalletError::broadcast(error_message(&error)))
            }
            _ => Err(WalletError::broadcast(format!("HTTP {} from service", status))
                .with_details(body.chars().take(200).collect::<String>())),
        }
    }
}

// =============================================================================
// Parsing Helpers
// =============================================================================

fn error_message(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(message) => message.clone(),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

fn parse_u128(value: &str, field: &str) -> WalletResult<u128> {
    value
        .trim()
        .parse::<u128>()
        .map_err(|_| WalletError::data_service(format!("Invalid {}: '{}'", field, value)))
}

fn parse_i128(value: &str, field: &str) -> WalletResult<i128> {
    value
        .trim()
        .parse::<i128>()
        .map_err(|_| WalletError::data_service(format!("Invalid {}: '{}'", field, value)))
}

/// Nonces arrive as decimal or `0x` hex strings
fn parse_nonce(value: &str) -> WalletResult<u64> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| WalletError::data_service(format!("Invalid nonce: '{}'", value)))
}
