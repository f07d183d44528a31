//! Hot Wallet
//!
//! Entry point tying configuration, key derivation, address issuance,
//! balances and the transaction builders together. Every operation takes a
//! coin tag and dispatches on the coin's accounting model.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{BlockDataService, BlockbookClient, GasPriceOracle, GasStationOracle, ServiceRegistry};
use crate::balances::BalanceAggregator;
use crate::config::WalletConfig;
use crate::error::{WalletError, WalletResult};
use crate::tx::{
    EvmAccount, EvmTransactionBuilder, RawTxCheck, RawTxValidator, TransactionBuilder, UtxoTransactionBuilder,
};
use crate::types::{Balance, CoinKind, CoinProfile, SendOutcome, SendRequest, SignedTransaction, ValidationReport};
use crate::utils::http::HttpClient;
use crate::utils::logging::redact_address;
use crate::wallet::{AddressPool, KeyDerivationEngine, SignerCache};

/// Result of scanning one coin at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub coin: String,
    pub error: Option<WalletError>,
}

impl ScanOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct HotWallet {
    config: WalletConfig,
    engine: Arc<KeyDerivationEngine>,
    pool: AddressPool,
    signers: SignerCache,
    services: ServiceRegistry,
    oracle: Option<Arc<dyn GasPriceOracle>>,
}

impl HotWallet {
    pub fn new(config: WalletConfig, services: ServiceRegistry, oracle: Option<Arc<dyn GasPriceOracle>>) -> Self {
        let engine = Arc::new(KeyDerivationEngine::new(SecretString::from(
            config.passphrase.expose_secret().to_string(),
        )));
        let signers = SignerCache::new(config.service.signer_ttl(), config.service.signer_cache_capacity);

        Self {
            pool: AddressPool::new(Arc::clone(&engine)),
            engine,
            signers,
            services,
            oracle,
            config,
        }
    }

    /// Wire the HTTP service clients described by the configuration
    pub fn from_config(config: WalletConfig) -> WalletResult<Self> {
        let http = HttpClient::new(config.service.request_timeout())?;

        let mut services = ServiceRegistry::new();
        for profile in config.coins.values().filter(|profile| !profile.kind.is_token()) {
            let client = BlockbookClient::with_client(profile.endpoint.as_str(), http.clone());
            services.insert(profile.tag.as_str(), Arc::new(client));
        }

        let oracle = config.service.gas_oracle_url.as_ref().map(|url| {
            Arc::new(GasStationOracle::with_client(
                url.as_str(),
                config.service.gas_oracle_units_per_gwei,
                http.clone(),
            )) as Arc<dyn GasPriceOracle>
        });

        Ok(Self::new(config, services, oracle))
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn pool(&self) -> &AddressPool {
        &self.pool
    }

    pub fn signers(&self) -> &SignerCache {
        &self.signers
    }

    pub fn engine(&self) -> &KeyDerivationEngine {
        &self.engine
    }

    // -------------------------------------------------------------------------
    // Addresses
    // -------------------------------------------------------------------------

    /// Scan every UTXO coin; a failing coin does not stop the others
    pub fn startup_scan(&self) -> Vec<ScanOutcome> {
        self.config
            .coins
            .values()
            .filter(|profile| profile.kind.is_utxo())
            .map(|profile| {
                let error = self.scan_profile(profile).err();
                if let Some(e) = &error {
                    tracing::error!(coin = %profile.tag, error = %e, "address scan failed");
                }
                ScanOutcome {
                    coin: profile.tag.clone(),
                    error,
                }
            })
            .collect()
    }

    /// Re-scan one UTXO coin
    pub fn scan(&self, coin: &str) -> WalletResult<()> {
        self.scan_profile(self.config.profile(coin)?)
    }

    fn scan_profile(&self, profile: &CoinProfile) -> WalletResult<()> {
        let service = self.service(profile)?;
        self.pool.scan(profile, service.as_ref())
    }

    /// Receiving address for a coin.
    ///
    /// UTXO coins issue a fresh address; Ethereum-family coins always answer
    /// with the signing account's address.
    pub fn get_address(&self, coin: &str, caller: Option<&str>) -> WalletResult<String> {
        let profile = self.config.profile(coin)?;
        match &profile.kind {
            CoinKind::UtxoCoin(_) => self.pool.next_address(profile),
            CoinKind::NativeEvmCoin(_) | CoinKind::EvmToken(_) => self.evm_address(profile, caller),
        }
    }

    /// Whether an address belongs to this wallet for the coin
    pub fn validate_address(&self, coin: &str, address: &str, caller: Option<&str>) -> WalletResult<bool> {
        let profile = self.config.profile(coin)?;
        let owned = match &profile.kind {
            CoinKind::UtxoCoin(_) => self.pool.is_owned(&profile.tag, address),
            CoinKind::NativeEvmCoin(_) | CoinKind::EvmToken(_) => self
                .evm_address(profile, caller)?
                .eq_ignore_ascii_case(address.trim()),
        };

        tracing::debug!(coin = %profile.tag, address = %redact_address(address), owned, "address checked");
        Ok(owned)
    }

    fn evm_address(&self, profile: &CoinProfile, caller: Option<&str>) -> WalletResult<String> {
        let (_, mnemonic) = self.config.evm_signer(profile, caller);
        self.engine.derive_evm_address(mnemonic)
    }

    // -------------------------------------------------------------------------
    // Balances
    // -------------------------------------------------------------------------

    pub fn get_balance(&self, coin: &str, caller: Option<&str>) -> WalletResult<Balance> {
        let profile = self.config.profile(coin)?;
        let service = self.service(profile)?;

        let evm_account = match &profile.kind {
            CoinKind::UtxoCoin(_) => None,
            _ => Some(self.evm_address(profile, caller)?),
        };

        BalanceAggregator::new(&self.engine).get_balance(profile, service.as_ref(), evm_account.as_deref())
    }

    // -------------------------------------------------------------------------
    // Sending
    // -------------------------------------------------------------------------

    /// Build, sign and broadcast a send
    pub fn send(&self, coin: &str, request: &SendRequest) -> WalletResult<SendOutcome> {
        let profile = self.config.profile(coin)?;
        let service = self.service(profile)?;
        self.with_builder(profile, service.as_ref(), request, |builder| builder.send(request))
    }

    /// Build and sign a send without broadcasting it
    pub fn build_signed(&self, coin: &str, request: &SendRequest) -> WalletResult<SignedTransaction> {
        let profile = self.config.profile(coin)?;
        let service = self.service(profile)?;
        self.with_builder(profile, service.as_ref(), request, |builder| builder.build_signed(request))
    }

    /// Send to the coin's configured cold-storage address
    pub fn send_to_cold_storage(&self, coin: &str, amount: Decimal) -> WalletResult<SendOutcome> {
        let profile = self.config.profile(coin)?;
        let address = profile.cold_address.as_deref().ok_or_else(|| {
            WalletError::configuration(format!("No cold-storage address configured for {}", profile.tag))
        })?;

        tracing::info!(coin = %profile.tag, amount = %amount, "sending to cold storage");
        self.send(&profile.tag, &SendRequest::new(address, amount))
    }

    fn with_builder<T>(
        &self,
        profile: &CoinProfile,
        service: &dyn BlockDataService,
        request: &SendRequest,
        run: impl FnOnce(&dyn TransactionBuilder) -> WalletResult<T>,
    ) -> WalletResult<T> {
        match &profile.kind {
            CoinKind::UtxoCoin(_) => {
                let builder = UtxoTransactionBuilder::new(&self.engine, profile, service)?;
                run(&builder)
            }
            CoinKind::NativeEvmCoin(_) | CoinKind::EvmToken(_) => {
                let oracle = self
                    .oracle
                    .as_deref()
                    .ok_or_else(|| WalletError::gas_price_unavailable("No gas-price oracle configured"))?;
                let evm = self.config.evm_params(profile)?;
                let token = match &profile.kind {
                    CoinKind::EvmToken(token) => Some(token),
                    _ => None,
                };
                let (key, mnemonic) = self.config.evm_signer(profile, request.caller.as_deref());

                let builder = EvmTransactionBuilder::new(
                    &profile.tag,
                    &self.engine,
                    &self.signers,
                    oracle,
                    service,
                    evm,
                    token,
                    EvmAccount { key, mnemonic },
                );
                run(&builder)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Check that a raw transaction pays `amount` to `address`.
    ///
    /// `amount` is read under the caller's amount convention. UTXO coins
    /// ignore `address` and check against every owned address.
    pub fn validate_raw_tx(
        &self,
        coin: &str,
        raw_tx: &str,
        address: &str,
        amount: u128,
        caller: Option<&str>,
    ) -> WalletResult<ValidationReport> {
        let profile = self.config.profile(coin)?;
        let check = RawTxCheck {
            raw_tx: raw_tx.to_string(),
            address: address.to_string(),
            amount,
            convention: self.config.amount_convention(caller),
        };

        let validator = RawTxValidator::new(&self.pool);
        match &profile.kind {
            CoinKind::UtxoCoin(params) => validator.validate_utxo(&profile.tag, params, &check),
            CoinKind::NativeEvmCoin(_) => validator.validate_evm(&profile.tag, None, &check),
            CoinKind::EvmToken(token) => validator.validate_evm(&profile.tag, Some(token), &check),
        }
    }

    fn service(&self, profile: &CoinProfile) -> WalletResult<Arc<dyn BlockDataService>> {
        self.services.get(self.config.service_tag(profile))
    }
}
