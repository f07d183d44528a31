//! Balance Aggregation
//!
//! Normalizes account balances reported in minor units into whole coin
//! units for every accounting model the wallet serves.

use rust_decimal::Decimal;

use super::units::from_minor_units;
use crate::api::{AccountId, BlockDataService};
use crate::error::{WalletError, WalletResult};
use crate::types::{Balance, CoinKind, CoinProfile, TokenParams, UtxoParams, EVM_NATIVE_DECIMALS};
use crate::wallet::KeyDerivationEngine;

pub struct BalanceAggregator<'a> {
    engine: &'a KeyDerivationEngine,
}

impl<'a> BalanceAggregator<'a> {
    pub fn new(engine: &'a KeyDerivationEngine) -> Self {
        Self { engine }
    }

    /// Balance of a coin.
    ///
    /// `evm_account` selects the Ethereum-family account to read; when it is
    /// `None` the account of the profile's own mnemonic is used.
    pub fn get_balance(
        &self,
        profile: &CoinProfile,
        service: &dyn BlockDataService,
        evm_account: Option<&str>,
    ) -> WalletResult<Balance> {
        let resolve_account = || match evm_account {
            Some(address) => Ok(address.to_string()),
            None => self.engine.derive_evm_address(&profile.mnemonic),
        };

        let balance = match &profile.kind {
            CoinKind::UtxoCoin(params) => self.utxo_balance(profile, params, service)?,
            CoinKind::NativeEvmCoin(_) => native_balance(&resolve_account()?, service)?,
            CoinKind::EvmToken(token) => token_balance(token, &resolve_account()?, service)?,
        };

        tracing::debug!(
            coin = %profile.tag,
            confirmed = %balance.confirmed,
            unconfirmed = %balance.unconfirmed,
            "balance fetched"
        );
        Ok(balance)
    }

    fn utxo_balance(
        &self,
        profile: &CoinProfile,
        params: &UtxoParams,
        service: &dyn BlockDataService,
    ) -> WalletResult<Balance> {
        let account = self.engine.derive_account(profile, false)?;
        let xpub = self.engine.account_xpub(&account, params);
        let info = service.account_info(&AccountId::ExtendedKey(xpub))?;

        Ok(Balance {
            confirmed: normalize(to_signed(info.balance)?, params.decimals)?,
            unconfirmed: normalize(info.unconfirmed_balance, params.decimals)?,
        })
    }
}

/// Native balance of an Ethereum-family account
pub fn native_balance(address: &str, service: &dyn BlockDataService) -> WalletResult<Balance> {
    let info = service.account_info(&AccountId::Address(address.to_string()))?;
    Ok(Balance {
        confirmed: normalize(to_signed(info.balance)?, EVM_NATIVE_DECIMALS)?,
        unconfirmed: normalize(info.unconfirmed_balance, EVM_NATIVE_DECIMALS)?,
    })
}

/// Token sub-balance of an Ethereum-family account.
///
/// A contract missing from the account's token list is a zero balance.
pub fn token_balance(
    token: &TokenParams,
    address: &str,
    service: &dyn BlockDataService,
) -> WalletResult<Balance> {
    let info = service.account_info(&AccountId::Address(address.to_string()))?;

    let confirmed = match info.token(&token.contract) {
        Some(entry) => normalize(to_signed(entry.balance)?, entry.decimals)?,
        None => Decimal::new(0, token.decimals.min(28)),
    };

    Ok(Balance {
        confirmed,
        unconfirmed: Decimal::ZERO,
    })
}

/// Service-reported minor units; a value that cannot be represented is bad service data
fn normalize(value: i128, decimals: u32) -> WalletResult<Decimal> {
    from_minor_units(value, decimals)
        .map_err(|e| WalletError::data_service(format!("Unusable balance {} at {} decimals: {}", value, decimals, e)))
}

fn to_signed(value: u128) -> WalletResult<i128> {
    i128::try_from(value).map_err(|_| WalletError::data_service("Balance out of range"))
}
