//! Raw Transaction Validator
//!
//! Decodes a caller-supplied signed transaction and compares what it pays
//! against what the caller expects. Value and destination are judged
//! independently; the caller accepts only when both match.

use bitcoin::consensus::encode::deserialize;
use bitcoin::Transaction as UtxoTransaction;
use ethers_core::types::{Transaction as EvmTransaction, U256};
use ethers_core::utils::rlp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::erc20::{decode_transfer, parse_evm_address};
use crate::balances::units::to_minor_units_truncated;
use crate::error::{WalletError, WalletResult};
use crate::types::{AmountConvention, TokenParams, UtxoParams, ValidationReport, EVM_NATIVE_DECIMALS};
use crate::wallet::address::script_for_address;
use crate::wallet::AddressPool;

/// Decimal places implied by `AmountConvention::SatoshiScaled`
const SATOSHI_DECIMALS: u32 = 8;

/// What a caller expects a raw transaction to pay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTxCheck {
    /// Hex encoded signed transaction, `0x` prefix optional
    pub raw_tx: String,
    /// Expected destination; Ethereum-family coins only, UTXO coins are
    /// checked against every owned address
    #[serde(default)]
    pub address: String,
    /// Expected amount under `convention`
    pub amount: u128,
    #[serde(default)]
    pub convention: AmountConvention,
}

pub struct RawTxValidator<'a> {
    pool: &'a AddressPool,
}

impl<'a> RawTxValidator<'a> {
    pub fn new(pool: &'a AddressPool) -> Self {
        Self { pool }
    }

    /// Check a UTXO transaction against the coin's owned addresses
    pub fn validate_utxo(&self, coin: &str, params: &UtxoParams, check: &RawTxCheck) -> WalletResult<ValidationReport> {
        let bytes = decode_hex(&check.raw_tx)?;
        let tx: UtxoTransaction = deserialize(&bytes)
            .map_err(|e| WalletError::validation_mismatch(format!("Undecodable transaction: {}", e)))?;

        let expected = expected_amount(check.amount, check.convention, params.decimals)?;

        let owned = self
            .pool
            .owned_addresses(coin)
            .iter()
            .map(|record| script_for_address(&record.address, params))
            .collect::<WalletResult<HashSet<_>>>()?;

        let mut report = ValidationReport::default();
        for output in &tx.output {
            if U256::from(output.value.to_sat()) == expected {
                report.value_matches = true;
            }
            if owned.contains(&output.script_pubkey) {
                report.address_matches = true;
            }
        }

        log_verdict(coin, &report);
        Ok(report)
    }

    /// Check an Ethereum-family transaction's native or token transfer
    pub fn validate_evm(&self, coin: &str, token: Option<&TokenParams>, check: &RawTxCheck) -> WalletResult<ValidationReport> {
        let bytes = decode_hex(&check.raw_tx)?;
        let tx: EvmTransaction = rlp::decode(&bytes)
            .map_err(|e| WalletError::validation_mismatch(format!("Undecodable transaction: {}", e)))?;
        let expected_to = parse_evm_address(&check.address)?;

        let (paid_to, paid) = match token {
            None => {
                let to = tx
                    .to
                    .ok_or_else(|| WalletError::validation_mismatch("Transaction has no recipient"))?;
                let expected = expected_amount(check.amount, check.convention, EVM_NATIVE_DECIMALS)?;
                (to == expected_to, tx.value == expected)
            }
            Some(token) => {
                let contract = parse_evm_address(&token.contract)?;
                let (recipient, amount) = decode_transfer(&tx.input)?;
                let expected = expected_amount(check.amount, check.convention, token.decimals)?;
                (
                    tx.to == Some(contract) && recipient == expected_to,
                    amount == expected,
                )
            }
        };

        let report = ValidationReport {
            value_matches: paid,
            address_matches: paid_to,
        };
        log_verdict(coin, &report);
        Ok(report)
    }
}

/// Expected amount in the asset's minor units
pub fn expected_amount(amount: u128, convention: AmountConvention, decimals: u32) -> WalletResult<U256> {
    match convention {
        AmountConvention::MinorUnits => Ok(U256::from(amount)),
        AmountConvention::SatoshiScaled => {
            let signed = i128::try_from(amount)
                .map_err(|_| WalletError::invalid_input("Expected amount out of range"))?;
            let whole = Decimal::try_from_i128_with_scale(signed, SATOSHI_DECIMALS)
                .map_err(|_| WalletError::invalid_input("Expected amount out of range"))?;
            Ok(to_minor_units_truncated(whole, decimals)?)
        }
    }
}

fn decode_hex(raw: &str) -> WalletResult<Vec<u8>> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| WalletError::validation_mismatch(format!("Raw transaction is not hex: {}", e)))
}

fn log_verdict(coin: &str, report: &ValidationReport) {
    tracing::info!(
        coin = %coin,
        value_matches = report.value_matches,
        address_matches = report.address_matches,
        "raw transaction checked"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_amount_conventions() {
        assert_eq!(
            expected_amount(3_100_000, AmountConvention::MinorUnits, 6).unwrap(),
            U256::from(3_100_000u64)
        );
        // 3.1 tokens with 8 implied decimals, token has 6
        assert_eq!(
            expected_amount(310_000_000, AmountConvention::SatoshiScaled, 6).unwrap(),
            U256::from(3_100_000u64)
        );
        // Native coin: 1e8-scaled to wei is a factor of 1e10
        assert_eq!(
            expected_amount(150_000_000, AmountConvention::SatoshiScaled, 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u64)
        );
    }

    #[test]
    fn test_satoshi_scaled_truncates_below_token_precision() {
        assert_eq!(
            expected_amount(123_456_789, AmountConvention::SatoshiScaled, 2).unwrap(),
            U256::from(123u64)
        );
    }

    #[test]
    fn test_non_hex_is_mismatch() {
        let err = decode_hex("0xnothex").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationMismatch);
    }
}
