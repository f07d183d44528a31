#![allow(dead_code)]

use rust_decimal::Decimal;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hotwallet_core::api::{AccountId, AccountInfo, BlockDataService, GasPriceOracle, ServiceRegistry, TokenBalance};
use hotwallet_core::config::ServiceSettings;
use hotwallet_core::fees::FeeQuote;
use hotwallet_core::{
    CoinKind, CoinProfile, EvmParams, GasQuote, HotWallet, TokenParams, Utxo, UtxoParams, WalletConfig, WalletError,
    WalletResult,
};

pub const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
pub const LEGAL: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";

/// First external address of the abandon phrase on Bitcoin
pub const BTC_ADDRESS_0: &str = "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA";
/// Ethereum account of the abandon phrase
pub const ETH_ADDRESS: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
pub const USDT_CONTRACT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
pub const PAYEE_BTC: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";
pub const PAYEE_ETH: &str = "0x673153460D01A22F9dAc129F2Ea59be3681921A4";

/// In-memory block-data service
#[derive(Default)]
pub struct MockService {
    accounts: Mutex<HashMap<String, AccountInfo>>,
    utxos: Mutex<Vec<Utxo>>,
    fee: Mutex<String>,
    reject: Mutex<Option<String>>,
    pub broadcasts: Mutex<Vec<String>>,
    queries: AtomicUsize,
}

impl MockService {
    pub fn new() -> Arc<Self> {
        let service = Self::default();
        *service.fee.lock().unwrap() = "-1".to_string();
        Arc::new(service)
    }

    pub fn set_account(&self, id: &str, info: AccountInfo) {
        self.accounts.lock().unwrap().insert(id.to_lowercase(), info);
    }

    pub fn set_utxos(&self, utxos: Vec<Utxo>) {
        *self.utxos.lock().unwrap() = utxos;
    }

    pub fn set_fee(&self, raw: &str) {
        *self.fee.lock().unwrap() = raw.to_string();
    }

    pub fn reject_broadcasts(&self, message: &str) {
        *self.reject.lock().unwrap() = Some(message.to_string());
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }

    pub fn last_broadcast(&self) -> Option<String> {
        self.broadcasts.lock().unwrap().last().cloned()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl BlockDataService for MockService {
    fn account_info(&self, account: &AccountId) -> WalletResult<AccountInfo> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let key = match account {
            AccountId::ExtendedKey(xpub) => xpub.to_lowercase(),
            AccountId::Address(address) => address.to_lowercase(),
        };
        Ok(self.accounts.lock().unwrap().get(&key).cloned().unwrap_or_default())
    }

    fn spendable_outputs(&self, _xpub: &str) -> WalletResult<Vec<Utxo>> {
        Ok(self.utxos.lock().unwrap().clone())
    }

    fn fee_estimate(&self, _confirmation_target: u32) -> WalletResult<FeeQuote> {
        FeeQuote::parse(&self.fee.lock().unwrap())
    }

    fn broadcast(&self, raw_hex: &str) -> WalletResult<String> {
        if let Some(message) = self.reject.lock().unwrap().clone() {
            return Err(WalletError::broadcast(message));
        }
        let mut broadcasts = self.broadcasts.lock().unwrap();
        broadcasts.push(raw_hex.to_string());
        Ok(format!("{:064x}", broadcasts.len()))
    }
}

/// Gas oracle answering with a fixed quote or a fixed failure
pub struct MockOracle {
    pub result: Mutex<WalletResult<GasQuote>>,
}

impl MockOracle {
    pub fn gwei(average: i64) -> Arc<Self> {
        let price = Decimal::from(average);
        Arc::new(Self {
            result: Mutex::new(Ok(GasQuote {
                average: price,
                fast: price,
                fastest: price,
            })),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Err(WalletError::data_service("oracle unreachable"))),
        })
    }
}

impl GasPriceOracle for MockOracle {
    fn quote(&self) -> WalletResult<GasQuote> {
        self.result.lock().unwrap().clone()
    }
}

pub fn secret(phrase: &str) -> SecretString {
    SecretString::from(phrase.to_string())
}

pub fn btc_profile() -> CoinProfile {
    CoinProfile::new("BTC", CoinKind::UtxoCoin(UtxoParams::bitcoin()), secret(ABANDON), "https://btc.invalid")
}

pub fn eth_profile() -> CoinProfile {
    CoinProfile::new("ETH", CoinKind::NativeEvmCoin(EvmParams::new(1)), secret(ABANDON), "https://eth.invalid")
}

pub fn usdt_profile() -> CoinProfile {
    CoinProfile::new(
        "USDT",
        CoinKind::EvmToken(TokenParams {
            parent: "ETH".into(),
            contract: USDT_CONTRACT.into(),
            decimals: 6,
        }),
        secret(ABANDON),
        "https://eth.invalid",
    )
}

pub fn base_config() -> WalletConfig {
    WalletConfig::new(ServiceSettings::default(), secret(""))
        .with_coin(btc_profile())
        .with_coin(eth_profile())
        .with_coin(usdt_profile())
}

/// Wallet with `service` answering for BTC and ETH
pub fn wallet_with(config: WalletConfig, service: &Arc<MockService>, oracle: Option<Arc<MockOracle>>) -> HotWallet {
    let services = ServiceRegistry::new()
        .with("BTC", service.clone() as Arc<dyn BlockDataService>)
        .with("ETH", service.clone() as Arc<dyn BlockDataService>);
    HotWallet::new(config, services, oracle.map(|oracle| oracle as Arc<dyn GasPriceOracle>))
}

pub fn wallet(service: &Arc<MockService>) -> HotWallet {
    wallet_with(base_config(), service, Some(MockOracle::gwei(20)))
}

/// Account xpub of a UTXO coin as the wallet reports it to the service
pub fn xpub_of(wallet: &HotWallet, coin: &str) -> String {
    let profile = wallet.config().profile(coin).unwrap();
    let account = wallet.engine().derive_account(profile, false).unwrap();
    wallet.engine().account_xpub(&account, profile.utxo_params().unwrap())
}

/// External-chain address at `index` for a UTXO coin
pub fn address_at(wallet: &HotWallet, coin: &str, index: u32) -> String {
    let profile = wallet.config().profile(coin).unwrap();
    let account = wallet.engine().derive_account(profile, false).unwrap();
    wallet
        .engine()
        .derive_address(&account, profile.utxo_params().unwrap(), index)
        .unwrap()
}

pub fn utxo(wallet: &HotWallet, index: u32, vout: u32, value: u64) -> Utxo {
    Utxo {
        txid: format!("{:064x}", 0xabc000 + index as u64 * 16 + vout as u64),
        vout,
        value,
        address: address_at(wallet, "BTC", index),
        path: format!("m/44'/0'/0'/0/{}", index),
    }
}

pub fn eth_account(balance: u128, nonce: u64, tokens: Vec<TokenBalance>) -> AccountInfo {
    AccountInfo {
        balance,
        nonce: Some(nonce),
        tokens,
        ..Default::default()
    }
}

pub fn usdt_balance(balance: u128) -> TokenBalance {
    TokenBalance {
        contract: USDT_CONTRACT.to_string(),
        balance,
        decimals: 6,
    }
}
