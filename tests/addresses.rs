mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::*;
use hotwallet_core::api::{AccountInfo, BlockDataService, ServiceRegistry};
use hotwallet_core::wallet::ADDRESS_GAP;
use hotwallet_core::{ErrorCode, HotWallet, WalletConfig};

#[test]
fn scan_seeds_gap_window_from_used_count() {
    let service = MockService::new();
    let wallet = wallet(&service);
    service.set_account(
        &xpub_of(&wallet, "BTC"),
        AccountInfo {
            used_address_count: 5,
            ..Default::default()
        },
    );

    wallet.scan("BTC").unwrap();

    let info = wallet.pool().info("BTC").unwrap();
    assert_eq!(info.last_used, 5);
    assert_eq!(info.records.len(), ADDRESS_GAP as usize);
    assert_eq!(info.records[0].index, 5);
    assert_eq!(info.records[0].address, address_at(&wallet, "BTC", 5));
    assert_eq!(info.records.last().unwrap().index, 5 + ADDRESS_GAP - 1);
}

#[test]
fn fresh_account_issues_index_one() {
    let service = MockService::new();
    let wallet = wallet(&service);
    wallet.scan("BTC").unwrap();

    // Index 0 is recorded but never issued
    assert!(wallet.validate_address("BTC", BTC_ADDRESS_0, None).unwrap());

    let first = wallet.get_address("BTC", None).unwrap();
    assert_eq!(first, address_at(&wallet, "BTC", 1));
    let second = wallet.get_address("BTC", None).unwrap();
    assert_eq!(second, address_at(&wallet, "BTC", 2));

    let info = wallet.pool().info("BTC").unwrap();
    assert_eq!(info.last_used, 2);
    // Already inside the scanned window, so nothing is appended
    assert_eq!(info.records.len(), ADDRESS_GAP as usize);
}

#[test]
fn issuance_past_the_window_extends_records() {
    let service = MockService::new();
    let wallet = wallet(&service);
    wallet.scan("BTC").unwrap();

    for _ in 0..ADDRESS_GAP {
        wallet.get_address("BTC", None).unwrap();
    }

    let info = wallet.pool().info("BTC").unwrap();
    assert_eq!(info.last_used, ADDRESS_GAP);
    assert_eq!(info.records.len(), ADDRESS_GAP as usize + 1);
    let issued = address_at(&wallet, "BTC", ADDRESS_GAP);
    assert!(wallet.validate_address("BTC", &issued, None).unwrap());
}

#[test]
fn unscanned_coin_cannot_issue() {
    let service = MockService::new();
    let wallet = wallet(&service);

    let err = wallet.get_address("BTC", None).unwrap_err();
    assert_eq!(err.code, ErrorCode::Configuration);
    assert!(!wallet.validate_address("BTC", BTC_ADDRESS_0, None).unwrap());
}

#[test]
fn concurrent_issuance_never_repeats() {
    let service = MockService::new();
    let wallet = wallet(&service);
    wallet.scan("BTC").unwrap();

    let issued: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    (0..10)
                        .map(|_| wallet.get_address("BTC", None).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = issued.iter().collect();
    assert_eq!(unique.len(), 80);
    assert_eq!(wallet.pool().info("BTC").unwrap().last_used, 80);
}

#[test]
fn startup_scan_reports_each_utxo_coin() {
    let service = MockService::new();
    let wallet = wallet(&service);

    let outcomes = wallet.startup_scan();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].coin, "BTC");
    assert!(outcomes[0].is_ok());
}

#[test]
fn evm_addresses_are_the_signing_account() {
    let service = MockService::new();
    let wallet = wallet(&service);

    assert_eq!(wallet.get_address("ETH", None).unwrap(), ETH_ADDRESS);
    assert_eq!(wallet.get_address("usdt", None).unwrap(), ETH_ADDRESS);
    assert!(wallet
        .validate_address("ETH", &ETH_ADDRESS.to_lowercase(), None)
        .unwrap());
    assert!(!wallet.validate_address("ETH", PAYEE_ETH, None).unwrap());
}

#[test]
fn scoped_caller_uses_its_own_account() {
    let service = MockService::new();
    let config = base_config().with_scoped_mnemonic("tyche", secret(LEGAL));
    let wallet = wallet_with(config, &service, None);

    let scoped = wallet.get_address("ETH", Some("tyche")).unwrap();
    assert_ne!(scoped, ETH_ADDRESS);
    assert_eq!(wallet.get_address("ETH", Some("someone-else")).unwrap(), ETH_ADDRESS);
    assert!(wallet.validate_address("USDT", &scoped, Some("tyche")).unwrap());
    assert!(!wallet.validate_address("USDT", &scoped, None).unwrap());
}

#[test]
fn unknown_coin_is_unavailable() {
    let service = MockService::new();
    let wallet = wallet(&service);
    assert_eq!(wallet.get_address("DOGE", None).unwrap_err().code, ErrorCode::Configuration);
}

#[test]
fn coin_without_mnemonic_fails_alone() {
    let text = r#"
[coins.BTC]
endpoint = "https://btc.invalid"
kind = { type = "utxo", coin_type = 0, p2pkh_version = 0, p2sh_version = 5 }

[coins.LTC]
endpoint = "https://ltc.invalid"
kind = { type = "utxo", coin_type = 2, p2pkh_version = 48, p2sh_version = 50 }
"#;
    let config =
        WalletConfig::from_toml_str(text, |name| (name == "BTC_MNEMONIC").then(|| ABANDON.to_string())).unwrap();

    let service = MockService::new();
    let services = ServiceRegistry::new()
        .with("BTC", service.clone() as Arc<dyn BlockDataService>)
        .with("LTC", service.clone() as Arc<dyn BlockDataService>);
    let wallet = HotWallet::new(config, services, None);

    let outcomes = wallet.startup_scan();
    assert_eq!(outcomes.len(), 2);
    let btc = outcomes.iter().find(|outcome| outcome.coin == "BTC").unwrap();
    let ltc = outcomes.iter().find(|outcome| outcome.coin == "LTC").unwrap();
    assert!(btc.is_ok());
    assert_eq!(ltc.error.as_ref().unwrap().code, ErrorCode::Configuration);

    assert_eq!(wallet.get_address("BTC", None).unwrap(), address_at(&wallet, "BTC", 1));
    assert_eq!(wallet.get_address("LTC", None).unwrap_err().code, ErrorCode::Configuration);
}
