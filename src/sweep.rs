//! Balance sweep
//!
//! Moves confirmed funds above a per-coin threshold to an external deposit
//! address, keeping a configured reserve in the hot wallet. Each coin is
//! handled independently; a failure is recorded and the run continues.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{WalletError, WalletResult};
use crate::hot_wallet::HotWallet;
use crate::types::{CoinProfile, SendRequest};
use crate::utils::logging::{redact_address, redact_hash};

/// Where swept funds for a coin go
pub trait DepositAddressSource {
    fn deposit_address(&self, profile: &CoinProfile) -> WalletResult<String>;
}

/// Sweep to the cold-storage address configured for each coin
#[derive(Debug, Default, Clone, Copy)]
pub struct ColdStorageAddresses;

impl DepositAddressSource for ColdStorageAddresses {
    fn deposit_address(&self, profile: &CoinProfile) -> WalletResult<String> {
        profile
            .cold_address
            .clone()
            .filter(|address| !address.trim().is_empty())
            .ok_or_else(|| WalletError::configuration(format!("No deposit address for {}", profile.tag)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweepOutcome {
    Swept { amount: Decimal, txid: String },
    BelowThreshold { confirmed: Decimal },
    Failed { error: WalletError },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub coin: String,
    #[serde(flatten)]
    pub outcome: SweepOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub entries: Vec<SweepEntry>,
}

impl SweepReport {
    pub fn swept(&self) -> impl Iterator<Item = &SweepEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, SweepOutcome::Swept { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &SweepEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, SweepOutcome::Failed { .. }))
    }
}

/// Sweep every coin that has a threshold configured
pub fn run_sweep(wallet: &HotWallet, deposits: &dyn DepositAddressSource) -> SweepReport {
    let mut report = SweepReport::default();

    for profile in wallet.config().coins.values() {
        if profile.sweep.is_none() {
            continue;
        }

        let outcome = sweep_coin(wallet, profile, deposits).unwrap_or_else(|error| {
            tracing::warn!(coin = %profile.tag, error = %error, "sweep failed");
            SweepOutcome::Failed { error }
        });

        report.entries.push(SweepEntry {
            coin: profile.tag.clone(),
            outcome,
        });
    }

    tracing::info!(
        coins = report.entries.len(),
        swept = report.swept().count(),
        failed = report.failed().count(),
        "sweep complete"
    );
    report
}

fn sweep_coin(
    wallet: &HotWallet,
    profile: &CoinProfile,
    deposits: &dyn DepositAddressSource,
) -> WalletResult<SweepOutcome> {
    let policy = match &profile.sweep {
        Some(policy) => policy,
        None => return Err(WalletError::internal("Coin has no sweep policy")),
    };

    let confirmed = wallet.get_balance(&profile.tag, None)?.confirmed;
    if confirmed <= policy.threshold {
        tracing::debug!(coin = %profile.tag, confirmed = %confirmed, "below sweep threshold");
        return Ok(SweepOutcome::BelowThreshold { confirmed });
    }

    let amount = confirmed - policy.reserve;
    if amount <= Decimal::ZERO {
        return Ok(SweepOutcome::BelowThreshold { confirmed });
    }

    let address = deposits.deposit_address(profile)?;
    let outcome = wallet.send(&profile.tag, &SendRequest::new(address.as_str(), amount))?;

    tracing::info!(
        coin = %profile.tag,
        amount = %amount,
        to = %redact_address(&address),
        txid = %redact_hash(&outcome.txid),
        "swept to deposit address"
    );
    Ok(SweepOutcome::Swept {
        amount,
        txid: outcome.txid,
    })
}
