//! Wallet Configuration
//!
//! Loaded once from TOML and injected into the wallet. Mnemonics and the
//! seed passphrase are never written in the file itself: entries name the
//! environment variables holding them and the loader resolves them.
//!
//! ```toml
//! [service]
//! gas_oracle_url = "https://gasstation.example/api"
//!
//! [coins.BTC]
//! name = "Bitcoin"
//! endpoint = "https://btc1.example"
//! cold_address = "1ColdStorage..."
//! sweep_threshold = "2.5"
//! kind = { type = "utxo", coin_type = 0, p2pkh_version = 0, p2sh_version = 5 }
//!
//! [coins.USDT]
//! kind = { type = "evm_token", parent = "ETH", contract = "0xdac1...", decimals = 6 }
//!
//! [callers]
//! scoped_mnemonics = { tyche = "MNEMONIC_ETHV2", ladon = "MNEMONIC_ETHV2" }
//! satoshi_scaled = ["tyche", "ladon"]
//! ```

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use crate::error::{WalletError, WalletResult};
use crate::types::{AmountConvention, CoinKind, CoinProfile, EvmParams, SweepPolicy};
use crate::utils::logging::{init_tracing, redact_if_sensitive, LogFormat};
use crate::wallet::SignerKey;

pub const DEFAULT_PASSPHRASE_ENV: &str = "MNEMONIC_PASSWORD";

// =============================================================================
// File Layout
// =============================================================================

/// `[service]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub request_timeout_secs: u64,
    pub signer_ttl_secs: u64,
    pub signer_cache_capacity: usize,
    pub gas_oracle_url: Option<String>,
    /// Oracle units per gwei; the gas station reports tenths of gwei
    pub gas_oracle_units_per_gwei: u32,
    pub passphrase_env: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            signer_ttl_secs: 300,
            signer_cache_capacity: 8,
            gas_oracle_url: None,
            gas_oracle_units_per_gwei: 10,
            passphrase_env: DEFAULT_PASSPHRASE_ENV.to_string(),
        }
    }
}

impl ServiceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn signer_ttl(&self) -> Duration {
        Duration::from_secs(self.signer_ttl_secs)
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Directive used when `RUST_LOG` is unset
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// One `[coins.<TAG>]` entry as written in the file
#[derive(Debug, Clone, Deserialize)]
struct CoinEntry {
    name: Option<String>,
    /// Tokens default to their parent's endpoint
    endpoint: Option<String>,
    mnemonic_env: Option<String>,
    cold_address: Option<String>,
    sweep_threshold: Option<Decimal>,
    sweep_reserve: Option<Decimal>,
    kind: CoinKind,
}

/// `[callers]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CallerEntries {
    scoped_mnemonics: BTreeMap<String, String>,
    satoshi_scaled: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    service: ServiceSettings,
    #[serde(default)]
    logging: LoggingSettings,
    #[serde(default)]
    coins: BTreeMap<String, CoinEntry>,
    #[serde(default)]
    callers: CallerEntries,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

#[derive(Debug)]
pub struct WalletConfig {
    pub service: ServiceSettings,
    pub logging: LoggingSettings,
    pub coins: BTreeMap<String, CoinProfile>,
    pub passphrase: SecretString,
    scoped_mnemonics: BTreeMap<String, SecretString>,
    satoshi_scaled: BTreeSet<String>,
}

impl WalletConfig {
    /// Start an empty configuration; used when profiles are built in code
    pub fn new(service: ServiceSettings, passphrase: SecretString) -> Self {
        Self {
            service,
            logging: LoggingSettings::default(),
            coins: BTreeMap::new(),
            passphrase,
            scoped_mnemonics: BTreeMap::new(),
            satoshi_scaled: BTreeSet::new(),
        }
    }

    pub fn with_coin(mut self, profile: CoinProfile) -> Self {
        self.coins.insert(profile.tag.clone(), profile);
        self
    }

    pub fn with_scoped_mnemonic(mut self, caller: &str, mnemonic: SecretString) -> Self {
        self.scoped_mnemonics.insert(caller.to_lowercase(), mnemonic);
        self
    }

    pub fn with_satoshi_scaled(mut self, caller: &str) -> Self {
        self.satoshi_scaled.insert(caller.to_lowercase());
        self
    }

    /// Load a config file, resolving secrets from the process environment
    pub fn from_file(path: impl AsRef<Path>) -> WalletResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            WalletError::configuration(format!("Cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&text, |name| std::env::var(name).ok())
    }

    /// Parse TOML, resolving secrets through `lookup`
    pub fn from_toml_str<F>(text: &str, lookup: F) -> WalletResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile = toml::from_str(text)?;
        let env = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let passphrase = SecretString::from(env(&file.service.passphrase_env).unwrap_or_default());
        let mut config = Self::new(file.service, passphrase);
        config.logging = file.logging;

        let entries: BTreeMap<String, CoinEntry> = file
            .coins
            .into_iter()
            .map(|(tag, entry)| (tag.to_uppercase(), entry))
            .collect();

        for (tag, entry) in &entries {
            let (endpoint, mnemonic_env) = match &entry.kind {
                CoinKind::EvmToken(token) => {
                    let parent_tag = token.parent.to_uppercase();
                    let parent = entries.get(&parent_tag).ok_or_else(|| {
                        WalletError::configuration(format!("Token {} names unknown parent {}", tag, token.parent))
                    })?;
                    if !matches!(parent.kind, CoinKind::NativeEvmCoin(_)) {
                        return Err(WalletError::configuration(format!(
                            "Token {} parent {} is not an Ethereum-family coin",
                            tag, parent_tag
                        )));
                    }
                    if entry.mnemonic_env.is_some() {
                        return Err(WalletError::configuration(format!(
                            "Token {} signs with its parent's account and cannot set mnemonic_env",
                            tag
                        )));
                    }
                    (
                        entry.endpoint.clone().or_else(|| parent.endpoint.clone()),
                        mnemonic_env_for(&parent_tag, parent),
                    )
                }
                _ => (entry.endpoint.clone(), mnemonic_env_for(tag, entry)),
            };

            let endpoint = endpoint
                .ok_or_else(|| WalletError::configuration(format!("{} has no endpoint", tag)))?;
            url::Url::parse(&endpoint)?;

            // An unset mnemonic only disables this coin; derivation reports it per call
            let mnemonic = env(&mnemonic_env).unwrap_or_else(|| {
                tracing::warn!(coin = %tag, mnemonic_env = %mnemonic_env, "mnemonic not set, coin unavailable");
                String::new()
            });

            let mut profile = CoinProfile::new(tag.as_str(), entry.kind.clone(), SecretString::from(mnemonic), endpoint);
            if let Some(name) = &entry.name {
                profile = profile.with_name(name.as_str());
            }
            if let Some(address) = &entry.cold_address {
                profile = profile.with_cold_address(address.as_str());
            }
            if let Some(threshold) = entry.sweep_threshold {
                profile = profile.with_sweep(SweepPolicy {
                    threshold,
                    reserve: entry.sweep_reserve.unwrap_or_default(),
                });
            }
            tracing::debug!(
                coin = %tag,
                mnemonic_env = %mnemonic_env,
                cold_address = %redact_if_sensitive("cold_address", profile.cold_address.as_deref().unwrap_or_default()),
                sweep = profile.sweep.is_some(),
                "coin configured"
            );
            config.coins.insert(tag.clone(), profile);
        }

        for (caller, var) in file.callers.scoped_mnemonics {
            let mnemonic = env(&var).ok_or_else(|| {
                WalletError::configuration(format!("Mnemonic for caller {} not set ({})", caller, var))
            })?;
            config = config.with_scoped_mnemonic(&caller, SecretString::from(mnemonic));
        }
        for caller in file.callers.satoshi_scaled {
            config = config.with_satoshi_scaled(&caller);
        }

        if let Some(url) = &config.service.gas_oracle_url {
            url::Url::parse(url)?;
        }

        tracing::info!(
            coins = config.coins.len(),
            scoped_callers = config.scoped_mnemonics.len(),
            passphrase = config.has_passphrase(),
            "wallet configuration loaded"
        );
        Ok(config)
    }

    /// Profile for a coin tag, case-insensitive
    pub fn profile(&self, coin: &str) -> WalletResult<&CoinProfile> {
        self.coins
            .get(&coin.to_uppercase())
            .ok_or_else(|| WalletError::configuration(format!("Coin {} is not available", coin)))
    }

    /// Network parameters of an Ethereum-family coin or of a token's parent
    pub fn evm_params<'a>(&'a self, profile: &'a CoinProfile) -> WalletResult<&'a EvmParams> {
        match &profile.kind {
            CoinKind::NativeEvmCoin(params) => Ok(params),
            CoinKind::EvmToken(token) => match &self.profile(&token.parent)?.kind {
                CoinKind::NativeEvmCoin(params) => Ok(params),
                _ => Err(WalletError::configuration(format!(
                    "Token {} parent {} is not an Ethereum-family coin",
                    profile.tag, token.parent
                ))),
            },
            CoinKind::UtxoCoin(_) => Err(WalletError::invalid_input(format!(
                "{} is not an Ethereum-family coin",
                profile.tag
            ))),
        }
    }

    /// Tag whose block-data service answers for a coin
    pub fn service_tag<'a>(&self, profile: &'a CoinProfile) -> &'a str {
        match &profile.kind {
            CoinKind::EvmToken(token) => &token.parent,
            _ => &profile.tag,
        }
    }

    /// Signing account for an Ethereum-family send.
    ///
    /// Callers with a scoped mnemonic sign from their own wallet; everyone
    /// else shares the account of the coin (or the token's parent).
    pub fn evm_signer<'a>(&'a self, profile: &'a CoinProfile, caller: Option<&str>) -> (SignerKey, &'a SecretString) {
        if let Some(caller) = caller.map(str::to_lowercase) {
            if let Some(mnemonic) = self.scoped_mnemonics.get(&caller) {
                return (SignerKey::Caller(caller), mnemonic);
            }
        }
        let owner = match &profile.kind {
            CoinKind::EvmToken(token) => token.parent.to_uppercase(),
            _ => profile.tag.clone(),
        };
        (SignerKey::Default(owner), &profile.mnemonic)
    }

    /// How a caller expresses expected amounts to the validator
    pub fn amount_convention(&self, caller: Option<&str>) -> AmountConvention {
        match caller {
            Some(caller) if self.satoshi_scaled.contains(&caller.to_lowercase()) => AmountConvention::SatoshiScaled,
            _ => AmountConvention::MinorUnits,
        }
    }

    /// Install the global `tracing` subscriber described by `[logging]`
    pub fn install_logging(&self) -> WalletResult<()> {
        init_tracing(&self.logging.filter, self.logging.format)
    }

    pub fn has_passphrase(&self) -> bool {
        !self.passphrase.expose_secret().is_empty()
    }
}

fn mnemonic_env_for(tag: &str, entry: &CoinEntry) -> String {
    entry
        .mnemonic_env
        .clone()
        .unwrap_or_else(|| format!("{}_MNEMONIC", tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::collections::HashMap;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    const SAMPLE: &str = r#"
[service]
gas_oracle_url = "https://gas.example/api"

[logging]
format = "json"

[coins.btc]
name = "Bitcoin"
endpoint = "https://btc.example"
cold_address = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT"
sweep_threshold = "2.5"
sweep_reserve = "0.5"
kind = { type = "utxo", coin_type = 0, p2pkh_version = 0, p2sh_version = 5, fee_target = 4 }

[coins.ETH]
endpoint = "https://eth.example"
kind = { type = "native_evm", chain_id = 1 }

[coins.USDT]
kind = { type = "evm_token", parent = "ETH", contract = "0xdac17f958d2ee523a2206206994597c13d831ec7", decimals = 6 }

[callers]
scoped_mnemonics = { tyche = "MNEMONIC_ETHV2" }
satoshi_scaled = ["Tyche", "ladon"]
"#;

    fn env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("BTC_MNEMONIC", PHRASE.to_string()),
            ("ETH_MNEMONIC", PHRASE.to_string()),
            ("MNEMONIC_ETHV2", PHRASE.to_string()),
            ("MNEMONIC_PASSWORD", "hunter2".to_string()),
        ])
    }

    fn load(text: &str, vars: &HashMap<&'static str, String>) -> WalletResult<WalletConfig> {
        WalletConfig::from_toml_str(text, |name| vars.get(name).cloned())
    }

    #[test]
    fn test_loads_profiles_and_defaults() {
        let config = load(SAMPLE, &env()).unwrap();

        assert_eq!(config.service.request_timeout_secs, 10);
        assert_eq!(config.service.gas_oracle_units_per_gwei, 10);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, "info");
        assert!(config.has_passphrase());

        let btc = config.profile("btc").unwrap();
        assert_eq!(btc.name, "Bitcoin");
        assert_eq!(btc.utxo_params().unwrap().fee_target, 4);
        assert_eq!(btc.sweep.as_ref().unwrap().reserve, Decimal::new(5, 1));

        let usdt = config.profile("USDT").unwrap();
        assert_eq!(usdt.endpoint, "https://eth.example");
        assert_eq!(config.service_tag(usdt), "ETH");
        assert_eq!(config.evm_params(usdt).unwrap().chain_id, 1);
    }

    #[test]
    fn test_scoped_signer_and_conventions() {
        let config = load(SAMPLE, &env()).unwrap();
        let usdt = config.profile("USDT").unwrap();

        let (key, _) = config.evm_signer(usdt, Some("TYCHE"));
        assert_eq!(key, SignerKey::Caller("tyche".into()));
        let (key, _) = config.evm_signer(usdt, None);
        assert_eq!(key, SignerKey::Default("ETH".into()));

        assert_eq!(config.amount_convention(Some("ladon")), AmountConvention::SatoshiScaled);
        assert_eq!(config.amount_convention(Some("other")), AmountConvention::MinorUnits);
        assert_eq!(config.amount_convention(None), AmountConvention::MinorUnits);
    }

    #[test]
    fn test_missing_mnemonic_only_disables_that_coin() {
        let mut vars = env();
        vars.remove("ETH_MNEMONIC");
        let config = load(SAMPLE, &vars).unwrap();

        assert!(config.profile("ETH").unwrap().mnemonic.expose_secret().is_empty());
        assert!(config.profile("USDT").unwrap().mnemonic.expose_secret().is_empty());
        assert_eq!(config.profile("BTC").unwrap().mnemonic.expose_secret(), PHRASE);
    }

    #[test]
    fn test_token_cannot_name_its_own_mnemonic() {
        let text = r#"
[coins.ETH]
endpoint = "https://eth.example"
kind = { type = "native_evm", chain_id = 1 }

[coins.USDT]
mnemonic_env = "USDT_MNEMONIC"
kind = { type = "evm_token", parent = "ETH", contract = "0xdac17f958d2ee523a2206206994597c13d831ec7", decimals = 6 }
"#;
        let err = load(text, &env()).unwrap_err();
        assert_eq!(err.code, ErrorCode::Configuration);
    }

    #[test]
    fn test_token_parent_must_be_evm() {
        let text = r#"
[coins.BTC]
endpoint = "https://btc.example"
kind = { type = "utxo", coin_type = 0, p2pkh_version = 0, p2sh_version = 5 }

[coins.FAKE]
endpoint = "https://btc.example"
kind = { type = "evm_token", parent = "BTC", contract = "0x00", decimals = 6 }
"#;
        let err = load(text, &env()).unwrap_err();
        assert_eq!(err.code, ErrorCode::Configuration);
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let text = r#"
[coins.ETH]
endpoint = "not a url"
kind = { type = "native_evm", chain_id = 1 }
"#;
        assert!(load(text, &env()).is_err());
    }

    #[test]
    fn test_unknown_coin() {
        let config = load(SAMPLE, &env()).unwrap();
        assert_eq!(config.profile("XYZ").unwrap_err().code, ErrorCode::Configuration);
    }
}
