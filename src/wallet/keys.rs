//! Ethereum-family signer cache
//!
//! Signers are materialized explicitly (by the balance check of a send) and
//! live for a bounded time. Signing never materializes a signer on its own:
//! a missing or expired entry is reported as `SignerNotReady`.

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes};
use ethers_signers::{LocalWallet, Signer};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{WalletError, WalletResult};
use crate::utils::TtlCache;

/// Which mnemonic a signer was built from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignerKey {
    /// The coin's own mnemonic
    Default(String),
    /// An alternate custodial wallet selected by the calling service
    Caller(String),
}

impl SignerKey {
    fn cache_key(&self) -> String {
        match self {
            SignerKey::Default(coin) => format!("default:{}", coin),
            SignerKey::Caller(caller) => format!("caller:{}", caller),
        }
    }
}

/// Time- and size-bounded cache of decrypted signers
pub struct SignerCache {
    signers: Mutex<TtlCache<LocalWallet>>,
}

impl SignerCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            signers: Mutex::new(TtlCache::new(ttl, capacity)),
        }
    }

    /// Return the cached signer's address, building the signer if it is
    /// missing or expired.
    pub fn materialize<F>(&self, key: &SignerKey, chain_id: u64, build: F) -> WalletResult<Address>
    where
        F: FnOnce() -> WalletResult<LocalWallet>,
    {
        let cache_key = key.cache_key();
        let mut signers = self.lock()?;

        if let Some(wallet) = signers.get(&cache_key) {
            if wallet.chain_id() == chain_id {
                return Ok(wallet.address());
            }
        }

        let wallet = build()?.with_chain_id(chain_id);
        let address = wallet.address();
        signers.set(cache_key, wallet);
        tracing::debug!(signer = ?key, "signer materialized");
        Ok(address)
    }

    /// Address of a live signer, if any
    pub fn address(&self, key: &SignerKey) -> WalletResult<Option<Address>> {
        let signers = self.lock()?;
        Ok(signers.get(&key.cache_key()).map(|wallet| wallet.address()))
    }

    /// Sign with a previously materialized signer and return the
    /// canonical signed encoding.
    pub fn sign(&self, key: &SignerKey, tx: &TypedTransaction) -> WalletResult<Bytes> {
        let signers = self.lock()?;
        let wallet = signers.get(&key.cache_key()).ok_or_else(|| {
            WalletError::signer_not_ready("Signer has not been materialized or has expired")
        })?;

        let signature = wallet.sign_transaction_sync(tx)?;
        Ok(tx.rlp_signed(&signature))
    }

    pub fn evict(&self, key: &SignerKey) -> WalletResult<bool> {
        let evicted = self.lock()?.invalidate(&key.cache_key());
        if evicted {
            tracing::debug!(signer = ?key, "signer evicted");
        }
        Ok(evicted)
    }

    /// Drop every expired signer, returning how many were removed
    pub fn purge_expired(&self) -> WalletResult<usize> {
        Ok(self.lock()?.cleanup())
    }

    pub fn len(&self) -> WalletResult<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> WalletResult<std::sync::MutexGuard<'_, TtlCache<LocalWallet>>> {
        self.signers
            .lock()
            .map_err(|_| WalletError::internal("Signer cache lock poisoned"))
    }
}
