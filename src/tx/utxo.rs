//! UTXO Transaction Builder
//!
//! Spends every available output of the account, pays the recipient,
//! returns change to the address of the first output and signs each input
//! with the key at its reported HD path.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use std::str::FromStr;

use super::signer::sign_p2pkh_input;
use super::TransactionBuilder;
use crate::api::BlockDataService;
use crate::balances::units::to_minor_units_u64;
use crate::error::{WalletError, WalletResult};
use crate::fees::{estimate_fee, estimate_legacy_size, fee_rate_per_kb};
use crate::types::{CoinProfile, SendRequest, SignedTransaction, Utxo, UtxoParams};
use crate::utils::logging::redact_address;
use crate::wallet::address::script_for_address;
use crate::wallet::{parse_chain_and_index, ExtendedKey, KeyDerivationEngine};

/// Outputs assumed by the size estimate: payee plus change
const ESTIMATED_OUTPUTS: usize = 2;

/// An unsigned spend and the accounting behind it
#[derive(Debug, Clone)]
pub struct UtxoSpendPlan {
    pub tx: Transaction,
    pub spent: Vec<Utxo>,
    pub amount: u64,
    pub fee: u64,
    pub change: Option<u64>,
}

impl UtxoSpendPlan {
    pub fn total_input(&self) -> u64 {
        self.spent.iter().map(|utxo| utxo.value).sum()
    }
}

pub struct UtxoTransactionBuilder<'a> {
    engine: &'a KeyDerivationEngine,
    profile: &'a CoinProfile,
    params: &'a UtxoParams,
    service: &'a dyn BlockDataService,
}

impl<'a> UtxoTransactionBuilder<'a> {
    pub fn new(
        engine: &'a KeyDerivationEngine,
        profile: &'a CoinProfile,
        service: &'a dyn BlockDataService,
    ) -> WalletResult<Self> {
        let params = profile.utxo_params().ok_or_else(|| {
            WalletError::invalid_input(format!("{} is not a UTXO coin", profile.tag))
        })?;
        Ok(Self {
            engine,
            profile,
            params,
            service,
        })
    }

    /// Gather outputs, price the fee and lay out the unsigned transaction
    pub fn plan(&self, account: &ExtendedKey, request: &SendRequest) -> WalletResult<UtxoSpendPlan> {
        let amount = to_minor_units_u64(request.amount, self.params.decimals)?;
        if amount == 0 {
            return Err(WalletError::invalid_input("Send amount must be positive"));
        }

        let xpub = self.engine.account_xpub(account, self.params);
        let utxos = self.service.spendable_outputs(&xpub)?;
        if utxos.is_empty() {
            return Err(WalletError::no_balance(format!(
                "No spendable outputs for {}",
                self.profile.tag
            )));
        }

        let available = utxos
            .iter()
            .try_fold(0u64, |acc, utxo| acc.checked_add(utxo.value))
            .ok_or_else(|| WalletError::data_service("Spendable output total overflows"))?;
        if amount > available {
            return Err(WalletError::insufficient_balance(format!(
                "Requested {} but only {} available",
                amount, available
            )));
        }

        let input = utxos
            .iter()
            .map(|utxo| {
                let txid = Txid::from_str(&utxo.txid)
                    .map_err(|e| WalletError::tx_build(format!("Invalid txid {}: {}", utxo.txid, e)))?;
                Ok(TxIn {
                    previous_output: OutPoint { txid, vout: utxo.vout },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::default(),
                })
            })
            .collect::<WalletResult<Vec<_>>>()?;

        let payee_script = script_for_address(&request.address, self.params)?;
        let change_script = script_for_address(&utxos[0].address, self.params)?;

        let quote = self.service.fee_estimate(self.params.fee_target)?;
        let rate = fee_rate_per_kb(&quote, self.params.decimals, self.params.fallback_fee_per_kb)?;
        let fee = estimate_fee(rate, estimate_legacy_size(input.len(), ESTIMATED_OUTPUTS));

        let mut output = vec![TxOut {
            value: Amount::from_sat(amount),
            script_pubkey: payee_script,
        }];

        let remainder = available as i128 - fee as i128 - amount as i128;
        let change = if remainder > 0 {
            let change = remainder as u64;
            output.push(TxOut {
                value: Amount::from_sat(change),
                script_pubkey: change_script,
            });
            Some(change)
        } else {
            None
        };

        let tx = Transaction {
            version: Version(self.params.tx_version),
            lock_time: LockTime::ZERO,
            input,
            output,
        };

        tracing::debug!(
            coin = %self.profile.tag,
            inputs = utxos.len(),
            available,
            amount,
            rate,
            fee,
            change = ?change,
            change_address = %redact_address(&utxos[0].address),
            "utxo spend planned"
        );

        Ok(UtxoSpendPlan {
            tx,
            spent: utxos,
            amount,
            fee,
            change,
        })
    }

    /// Sign every input of a plan with the key at its recorded path
    pub fn sign(&self, account: &ExtendedKey, plan: &UtxoSpendPlan) -> WalletResult<Transaction> {
        let secp = self.engine.secp();
        let mut tx = plan.tx.clone();

        for (index, utxo) in plan.spent.iter().enumerate() {
            let (chain, child) = parse_chain_and_index(&utxo.path)?;
            let secret_key = self.engine.derive_private_key_on(account, chain, child)?;

            let script_pubkey = script_for_address(&utxo.address, self.params)?;
            let public_key = bitcoin::PublicKey::new(secret_key.public_key(secp));
            if script_pubkey != ScriptBuf::new_p2pkh(&public_key.pubkey_hash()) {
                return Err(WalletError::tx_build(format!(
                    "Key at {} does not control output {}:{}",
                    utxo.path, utxo.txid, utxo.vout
                )));
            }

            sign_p2pkh_input(secp, &mut tx, index, &script_pubkey, &secret_key, self.params.sighash)?;
        }

        Ok(tx)
    }
}

impl TransactionBuilder for UtxoTransactionBuilder<'_> {
    fn build_signed(&self, request: &SendRequest) -> WalletResult<SignedTransaction> {
        let account = self.engine.derive_account(self.profile, true)?;
        let plan = self.plan(&account, request)?;
        let tx = self.sign(&account, &plan)?;

        Ok(SignedTransaction {
            coin: self.profile.tag.clone(),
            raw_hex: serialize_hex(&tx),
            local_txid: tx.compute_txid().to_string(),
            fee: Some(plan.total_input() - plan.amount - plan.change.unwrap_or(0)),
        })
    }

    fn broadcast(&self, signed: &SignedTransaction) -> WalletResult<String> {
        self.service.broadcast(&signed.raw_hex)
    }
}
