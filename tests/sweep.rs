mod common;

use rust_decimal::Decimal;

use common::*;
use hotwallet_core::api::AccountInfo;
use hotwallet_core::sweep::{run_sweep, ColdStorageAddresses, DepositAddressSource, SweepOutcome};
use hotwallet_core::{CoinKind, CoinProfile, ErrorCode, SweepPolicy, UtxoParams, WalletResult};

fn policy(threshold: Decimal, reserve: Decimal) -> SweepPolicy {
    SweepPolicy { threshold, reserve }
}

fn litecoin() -> CoinProfile {
    let params = UtxoParams {
        coin_type: 2,
        p2pkh_version: 0x30,
        p2sh_version: 0x32,
        bech32_hrp: None,
        ..UtxoParams::bitcoin()
    };
    CoinProfile::new("LTC", CoinKind::UtxoCoin(params), secret(ABANDON), "https://ltc.invalid")
}

#[test]
fn surplus_above_threshold_is_swept() {
    let service = MockService::new();
    let config = base_config()
        .with_coin(
            btc_profile()
                .with_cold_address(PAYEE_BTC)
                .with_sweep(policy(Decimal::new(1, 3), Decimal::new(5, 4))),
        )
        .with_coin(
            eth_profile()
                .with_cold_address(PAYEE_ETH)
                .with_sweep(policy(Decimal::TEN, Decimal::ZERO)),
        )
        // No block-data service is registered for LTC
        .with_coin(litecoin().with_sweep(policy(Decimal::ONE, Decimal::ZERO)));
    let wallet = wallet_with(config, &service, Some(MockOracle::gwei(20)));

    service.set_account(
        &xpub_of(&wallet, "BTC"),
        AccountInfo {
            balance: 150_000,
            ..Default::default()
        },
    );
    service.set_utxos(vec![utxo(&wallet, 0, 0, 150_000)]);
    service.set_account(ETH_ADDRESS, eth_account(1_000_000_000_000_000_000, 0, vec![]));

    let report = run_sweep(&wallet, &ColdStorageAddresses);
    assert_eq!(report.entries.len(), 3);

    let btc = report.entries.iter().find(|entry| entry.coin == "BTC").unwrap();
    match &btc.outcome {
        SweepOutcome::Swept { amount, .. } => assert_eq!(*amount, Decimal::new(10, 4)),
        other => panic!("unexpected BTC outcome {:?}", other),
    }

    let eth = report.entries.iter().find(|entry| entry.coin == "ETH").unwrap();
    assert_eq!(eth.outcome, SweepOutcome::BelowThreshold { confirmed: Decimal::ONE });

    let ltc = report.entries.iter().find(|entry| entry.coin == "LTC").unwrap();
    match &ltc.outcome {
        SweepOutcome::Failed { error } => assert_eq!(error.code, ErrorCode::Configuration),
        other => panic!("unexpected LTC outcome {:?}", other),
    }

    assert_eq!(report.swept().count(), 1);
    assert_eq!(report.failed().count(), 1);
    assert_eq!(service.broadcast_count(), 1);
}

struct FixedDeposit(&'static str);

impl DepositAddressSource for FixedDeposit {
    fn deposit_address(&self, _profile: &CoinProfile) -> WalletResult<String> {
        Ok(self.0.to_string())
    }
}

#[test]
fn deposit_source_overrides_cold_address() {
    let service = MockService::new();
    let config = base_config().with_coin(btc_profile().with_sweep(policy(Decimal::ZERO, Decimal::ZERO)));
    let wallet = wallet_with(config, &service, None);

    service.set_account(
        &xpub_of(&wallet, "BTC"),
        AccountInfo {
            balance: 200_000,
            ..Default::default()
        },
    );
    service.set_utxos(vec![utxo(&wallet, 0, 0, 200_000)]);

    // Without a cold address the default source has nowhere to send
    let report = run_sweep(&wallet, &ColdStorageAddresses);
    assert_eq!(report.failed().count(), 1);
    assert_eq!(service.broadcast_count(), 0);

    let report = run_sweep(&wallet, &FixedDeposit(PAYEE_BTC));
    assert_eq!(report.swept().count(), 1);
    assert_eq!(service.broadcast_count(), 1);
}
