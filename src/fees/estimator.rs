//! Fee Estimator
//!
//! Turns block-data fee quotes and gas-oracle snapshots into concrete
//! prices for the transaction builders.

use ethers_core::types::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::balances::units::{to_minor_units_truncated, to_minor_units_u64_truncated};
use crate::error::{WalletError, WalletResult};
use crate::types::GasQuote;

/// Fee per kilobyte (minor units) used when the service cannot estimate
pub const DEFAULT_FEE_PER_KB: u64 = 4000;

/// Raw estimate values the block-data service uses for "no estimate"
pub const UNKNOWN_FEE_SENTINELS: [&str; 3] = ["-1", "0", ""];

/// Per-input size of a signed P2PKH input in the legacy size approximation
pub const LEGACY_INPUT_SIZE: u64 = 180;
/// Per-output size in the legacy size approximation
pub const LEGACY_OUTPUT_SIZE: u64 = 34;
/// Fixed overhead in the legacy size approximation
pub const LEGACY_OVERHEAD: u64 = 124;

/// Decimal places of a gwei relative to wei
const GWEI_DECIMALS: u32 = 9;

// =============================================================================
// UTXO Fees
// =============================================================================

/// A block-data fee estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeQuote {
    /// Whole coin units per kilobyte
    PerKilobyte(Decimal),
    /// The service had no estimate
    Unknown,
}

impl FeeQuote {
    /// Interpret the service's raw estimate string.
    ///
    /// Sentinels and non-positive values mean "unknown"; anything that is
    /// not a number is a `DataService` error.
    pub fn parse(raw: &str) -> WalletResult<Self> {
        let trimmed = raw.trim();
        if UNKNOWN_FEE_SENTINELS.contains(&trimmed) {
            return Ok(FeeQuote::Unknown);
        }

        let rate = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| WalletError::data_service(format!("Invalid fee estimate: '{}'", raw)))?;

        if rate <= Decimal::ZERO {
            Ok(FeeQuote::Unknown)
        } else {
            Ok(FeeQuote::PerKilobyte(rate))
        }
    }
}

/// Fee rate in minor units per kilobyte; never zero.
pub fn fee_rate_per_kb(quote: &FeeQuote, decimals: u32, fallback: u64) -> WalletResult<u64> {
    let fallback = if fallback == 0 { DEFAULT_FEE_PER_KB } else { fallback };

    match quote {
        FeeQuote::Unknown => {
            tracing::debug!(rate = fallback, "fee estimate unknown, using fallback rate");
            Ok(fallback)
        }
        FeeQuote::PerKilobyte(rate) => {
            let minor = to_minor_units_u64_truncated(*rate, decimals)?;
            Ok(if minor == 0 { fallback } else { minor })
        }
    }
}

/// Approximate size of a legacy P2PKH transaction
pub fn estimate_legacy_size(inputs: usize, outputs: usize) -> u64 {
    LEGACY_INPUT_SIZE * inputs as u64 + LEGACY_OUTPUT_SIZE * outputs as u64 + LEGACY_OVERHEAD
}

/// `rate / 1024 * size`, rounded down
pub fn estimate_fee(rate_per_kb: u64, size: u64) -> u64 {
    ((rate_per_kb as u128 * size as u128) / 1024) as u64
}

// =============================================================================
// EVM Gas
// =============================================================================

/// Wei price of the oracle's average tier
pub fn gas_price_wei(quote: &GasQuote) -> WalletResult<U256> {
    if quote.average <= Decimal::ZERO {
        return Err(WalletError::gas_price_unavailable("Average gas price is not positive"));
    }
    Ok(to_minor_units_truncated(quote.average, GWEI_DECIMALS)?)
}
