//! Minor-unit conversions
//!
//! All monetary arithmetic is exact decimal arithmetic. Amounts that carry
//! more precision than the target unit supports are rejected unless the
//! caller explicitly asks for truncation.

use ethers_core::types::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::error::WalletError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
    #[error("amount {amount} has more than {decimals} decimal places")]
    ExcessPrecision { amount: Decimal, decimals: u32 },
    #[error("decimal count {0} is out of range")]
    DecimalsOutOfRange(u32),
    #[error("value does not fit the target type")]
    Overflow,
}

impl From<UnitError> for WalletError {
    fn from(e: UnitError) -> Self {
        WalletError::invalid_input(e.to_string())
    }
}

/// Largest decimal count a token may declare
pub const MAX_DECIMALS: u32 = 77;

/// Largest scale a `Decimal` can represent
const MAX_DECIMAL_SCALE: u32 = 28;

/// Largest mantissa a `Decimal` can hold (2^96 - 1)
const MAX_MANTISSA: u128 = 79_228_162_514_264_337_593_543_950_335;

/// `amount * 10^decimals` as an exact integer.
///
/// `to_minor_units(1.5, 6) == 1_500_000`.
pub fn to_minor_units(amount: Decimal, decimals: u32) -> Result<U256, UnitError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitError::DecimalsOutOfRange(decimals));
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitError::Negative(amount));
    }

    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > decimals {
        return Err(UnitError::ExcessPrecision { amount, decimals });
    }

    U256::from(normalized.mantissa().unsigned_abs())
        .checked_mul(U256::exp10((decimals - scale) as usize))
        .ok_or(UnitError::Overflow)
}

/// Like `to_minor_units`, dropping precision beyond `decimals`
pub fn to_minor_units_truncated(amount: Decimal, decimals: u32) -> Result<U256, UnitError> {
    let truncated = if decimals < MAX_DECIMAL_SCALE {
        amount.round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
    } else {
        amount
    };
    to_minor_units(truncated, decimals)
}

/// Minor units of a UTXO coin, which always fit in 64 bits
pub fn to_minor_units_u64(amount: Decimal, decimals: u32) -> Result<u64, UnitError> {
    narrow_u64(to_minor_units(amount, decimals)?)
}

pub fn to_minor_units_u64_truncated(amount: Decimal, decimals: u32) -> Result<u64, UnitError> {
    narrow_u64(to_minor_units_truncated(amount, decimals)?)
}

/// `value / 10^decimals` as a decimal.
///
/// Exact whenever the value fits a `Decimal`. Wider values keep their
/// integer part and lose trailing fractional digits.
pub fn from_minor_units(value: i128, decimals: u32) -> Result<Decimal, UnitError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitError::DecimalsOutOfRange(decimals));
    }

    let (mut value, mut scale) = (value, decimals);
    while scale > MAX_DECIMAL_SCALE || value.unsigned_abs() > MAX_MANTISSA {
        if scale == 0 {
            return Err(UnitError::Overflow);
        }
        value /= 10;
        scale -= 1;
    }

    Decimal::try_from_i128_with_scale(value, scale)
        .map(|d| d.normalize())
        .map_err(|_| UnitError::Overflow)
}

fn narrow_u64(value: U256) -> Result<u64, UnitError> {
    if value > U256::from(u64::MAX) {
        return Err(UnitError::Overflow);
    }
    Ok(value.as_u64())
}
