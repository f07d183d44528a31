//! Ethereum-family Transaction Builder
//!
//! Legacy (EIP-155) transactions for the native coin and ERC20 token
//! transfers. The signer is materialized by the balance check and signing
//! refuses to run without it.

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, TransactionRequest, U256};
use ethers_signers::LocalWallet;
use secrecy::SecretString;

use super::erc20::{encode_transfer, parse_evm_address};
use super::TransactionBuilder;
use crate::api::{AccountId, AccountInfo, BlockDataService, GasPriceOracle};
use crate::balances::units::to_minor_units;
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::fees::gas_price_wei;
use crate::types::{EvmParams, SendRequest, SignedTransaction, TokenParams, EVM_NATIVE_DECIMALS};
use crate::utils::crypto::{keccak256, to_checksum_address};
use crate::utils::logging::redact_address;
use crate::wallet::{KeyDerivationEngine, SignerCache, SignerKey};

/// Which signing account a send uses
pub struct EvmAccount<'a> {
    pub key: SignerKey,
    pub mnemonic: &'a SecretString,
}

pub struct EvmTransactionBuilder<'a> {
    /// Tag of the coin being sent (the token tag for token sends)
    coin: &'a str,
    engine: &'a KeyDerivationEngine,
    signers: &'a SignerCache,
    oracle: &'a dyn GasPriceOracle,
    service: &'a dyn BlockDataService,
    evm: &'a EvmParams,
    token: Option<&'a TokenParams>,
    account: EvmAccount<'a>,
}

/// Validated amount of a send in the asset's minor units
struct Funded {
    from: Address,
    nonce: u64,
    value: U256,
}

impl<'a> EvmTransactionBuilder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        coin: &'a str,
        engine: &'a KeyDerivationEngine,
        signers: &'a SignerCache,
        oracle: &'a dyn GasPriceOracle,
        service: &'a dyn BlockDataService,
        evm: &'a EvmParams,
        token: Option<&'a TokenParams>,
        account: EvmAccount<'a>,
    ) -> Self {
        Self {
            coin,
            engine,
            signers,
            oracle,
            service,
            evm,
            token,
            account,
        }
    }

    /// Materialize the signer and check the account can cover the send
    fn check_balance(&self, request: &SendRequest) -> WalletResult<Funded> {
        let from = self.signers.materialize(&self.account.key, self.evm.chain_id, || {
            let secret = self.engine.derive_evm_secret(self.account.mnemonic)?;
            Ok(LocalWallet::from_bytes(&secret[..])?)
        })?;

        let info = self
            .service
            .account_info(&AccountId::Address(to_checksum_address(from.as_bytes())))?;

        if info.balance == 0 {
            return Err(WalletError::insufficient_balance(format!(
                "No native balance on {} account",
                self.coin
            )));
        }

        let value = match self.token {
            None => {
                let value = to_minor_units(request.amount, EVM_NATIVE_DECIMALS)?;
                if value > U256::from(info.balance) {
                    return Err(WalletError::insufficient_balance(format!(
                        "Requested {} {} exceeds balance",
                        request.amount, self.coin
                    )));
                }
                value
            }
            Some(token) => token_value(token, &info, request, self.coin)?,
        };

        if value.is_zero() {
            return Err(WalletError::invalid_input("Send amount must be positive"));
        }

        let nonce = info
            .nonce
            .ok_or_else(|| WalletError::data_service("Account nonce missing from service response"))?;

        Ok(Funded { from, nonce, value })
    }

    fn gas_price(&self) -> WalletResult<U256> {
        let quote = self.oracle.quote().map_err(|e| {
            if e.code == ErrorCode::GasPriceUnavailable {
                e
            } else {
                WalletError::gas_price_unavailable(e.message)
            }
        })?;
        gas_price_wei(&quote)
    }

    fn payload(&self, request: &SendRequest, funded: &Funded, gas_price: U256) -> WalletResult<TypedTransaction> {
        let recipient = parse_evm_address(&request.address)?;

        let tx = match self.token {
            None => TransactionRequest::new()
                .to(recipient)
                .value(funded.value)
                .gas(self.evm.native_gas_limit),
            Some(token) => {
                let contract = parse_evm_address(&token.contract)
                    .map_err(|e| WalletError::configuration(e.message))?;
                TransactionRequest::new()
                    .to(contract)
                    .value(U256::zero())
                    .data(encode_transfer(recipient, funded.value))
                    .gas(self.evm.token_gas_limit)
            }
        };

        Ok(tx
            .from(funded.from)
            .nonce(funded.nonce)
            .gas_price(gas_price)
            .chain_id(self.evm.chain_id)
            .into())
    }
}

impl TransactionBuilder for EvmTransactionBuilder<'_> {
    fn build_signed(&self, request: &SendRequest) -> WalletResult<SignedTransaction> {
        let funded = self.check_balance(request)?;
        let gas_price = self.gas_price()?;
        let tx = self.payload(request, &funded, gas_price)?;

        let raw = self.signers.sign(&self.account.key, &tx)?;
        let gas_limit = tx.gas().copied().unwrap_or_default();
        let fee = gas_limit.checked_mul(gas_price).and_then(|fee| {
            if fee > U256::from(u64::MAX) {
                None
            } else {
                Some(fee.as_u64())
            }
        });

        tracing::debug!(
            coin = %self.coin,
            from = %redact_address(&to_checksum_address(funded.from.as_bytes())),
            nonce = funded.nonce,
            gas_price = %gas_price,
            token = self.token.is_some(),
            "evm transaction signed"
        );

        Ok(SignedTransaction {
            coin: self.coin.to_string(),
            raw_hex: format!("0x{}", hex::encode(&raw)),
            local_txid: format!("0x{}", hex::encode(keccak256(&raw))),
            fee,
        })
    }

    fn broadcast(&self, signed: &SignedTransaction) -> WalletResult<String> {
        self.service.broadcast(&signed.raw_hex)
    }
}

/// Token amount in the token's own minor units, checked against its balance
fn token_value(
    token: &TokenParams,
    info: &AccountInfo,
    request: &SendRequest,
    coin: &str,
) -> WalletResult<U256> {
    let entry = info.token(&token.contract).ok_or_else(|| {
        WalletError::insufficient_balance(format!("No {} balance on account", coin))
    })?;

    let value = to_minor_units(request.amount, entry.decimals)?;
    if value > U256::from(entry.balance) {
        return Err(WalletError::insufficient_balance(format!(
            "Requested {} {} exceeds token balance",
            request.amount, coin
        )));
    }
    Ok(value)
}
