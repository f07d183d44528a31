//! Address Pool
//!
//! Tracks, per UTXO coin, the highest issued derivation index and every
//! address derived so far. State is rebuilt from the block-data service at
//! startup; addresses issued but never used before a restart are skipped
//! by the next scan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::api::{AccountId, BlockDataService};
use crate::error::{WalletError, WalletResult};
use crate::types::{AddrInfo, AddressRecord, CoinProfile, UtxoParams};
use crate::utils::logging::redact_address;
use crate::wallet::KeyDerivationEngine;

/// Look-ahead addresses derived beyond the used-address count
pub const ADDRESS_GAP: u32 = 20;

pub struct AddressPool {
    engine: Arc<KeyDerivationEngine>,
    coins: RwLock<HashMap<String, Arc<Mutex<AddrInfo>>>>,
}

impl AddressPool {
    pub fn new(engine: Arc<KeyDerivationEngine>) -> Self {
        Self {
            engine,
            coins: RwLock::new(HashMap::new()),
        }
    }

    /// Re-seed a coin's state from the service's used-address count
    pub fn scan(&self, profile: &CoinProfile, service: &dyn BlockDataService) -> WalletResult<()> {
        let params = utxo_params(profile)?;
        let account = self.engine.derive_account(profile, false)?;
        let xpub = self.engine.account_xpub(&account, params);
        let used = service
            .account_info(&AccountId::ExtendedKey(xpub))?
            .used_address_count;

        let mut records = Vec::with_capacity(ADDRESS_GAP as usize);
        for offset in 0..ADDRESS_GAP {
            let index = used.checked_add(offset).ok_or_else(|| {
                WalletError::derivation("Address index overflow during scan")
            })?;
            records.push(AddressRecord {
                address: self.engine.derive_address(&account, params, index)?,
                index,
                coin: profile.tag.clone(),
            });
        }

        let info = AddrInfo {
            last_used: used,
            records,
        };

        self.write_map()?
            .insert(profile.tag.clone(), Arc::new(Mutex::new(info)));

        tracing::info!(coin = %profile.tag, used_addresses = used, gap = ADDRESS_GAP, "address scan complete");
        Ok(())
    }

    /// Issue the address at `last_used + 1` and advance the counter.
    ///
    /// Serialized per coin, so concurrent callers never share an index.
    pub fn next_address(&self, profile: &CoinProfile) -> WalletResult<String> {
        let params = utxo_params(profile)?;
        let entry = self.entry(&profile.tag)?;
        let account = self.engine.derive_account(profile, false)?;

        let mut info = entry
            .lock()
            .map_err(|_| WalletError::internal("Address pool lock poisoned"))?;

        let index = info
            .last_used
            .checked_add(1)
            .ok_or_else(|| WalletError::derivation("Address index overflow"))?;
        let address = self.engine.derive_address(&account, params, index)?;

        if !info.records.iter().any(|record| record.index == index) {
            info.records.push(AddressRecord {
                address: address.clone(),
                index,
                coin: profile.tag.clone(),
            });
        }
        info.last_used = index;

        tracing::info!(coin = %profile.tag, index, address = %redact_address(&address), "address issued");
        Ok(address)
    }

    /// Whether an address was derived by this pool for the coin
    pub fn is_owned(&self, coin: &str, address: &str) -> bool {
        self.with_info(coin, |info| {
            info.records.iter().any(|record| record.address == address.trim())
        })
        .unwrap_or(false)
    }

    /// Snapshot of every recorded address for the coin
    pub fn owned_addresses(&self, coin: &str) -> Vec<AddressRecord> {
        self.with_info(coin, |info| info.records.clone()).unwrap_or_default()
    }

    /// Snapshot of a coin's issuance state
    pub fn info(&self, coin: &str) -> Option<AddrInfo> {
        self.with_info(coin, |info| info.clone())
    }

    fn with_info<T>(&self, coin: &str, f: impl FnOnce(&AddrInfo) -> T) -> Option<T> {
        let entry = self.coins.read().ok()?.get(coin).cloned()?;
        let info = entry.lock().ok()?;
        Some(f(&info))
    }

    fn entry(&self, coin: &str) -> WalletResult<Arc<Mutex<AddrInfo>>> {
        self.coins
            .read()
            .map_err(|_| WalletError::internal("Address pool lock poisoned"))?
            .get(coin)
            .cloned()
            .ok_or_else(|| {
                WalletError::configuration(format!("Address pool for {} has not been scanned", coin))
            })
    }

    fn write_map(
        &self,
    ) -> WalletResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Mutex<AddrInfo>>>>> {
        self.coins
            .write()
            .map_err(|_| WalletError::internal("Address pool lock poisoned"))
    }
}

fn utxo_params(profile: &CoinProfile) -> WalletResult<&UtxoParams> {
    profile.utxo_params().ok_or_else(|| {
        WalletError::invalid_input(format!("{} does not use an address pool", profile.tag))
    })
}
