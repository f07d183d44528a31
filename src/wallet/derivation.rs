//! Key Derivation
//!
//! Derives account keys, addresses and signing keys from a coin's BIP39
//! mnemonic along `purpose'/coinType'/0'/chain/index`.
//!
//! SECURITY: Seeds are zeroized on drop and account keys never outlive
//! the operation that derived them.

use bitcoin::bip32::{ChildNumber, Xpriv, Xpub};
use bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use bitcoin::NetworkKind;
use bip39::Mnemonic;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{WalletError, WalletResult};
use crate::types::{CoinProfile, UtxoParams, EVM_COIN_TYPE};
use crate::utils::crypto::{keccak256, to_checksum_address};
use crate::wallet::address::{encode_p2pkh, encode_xpub};

/// Account index used by every coin
pub const ACCOUNT_INDEX: u32 = 0;

/// Chain index addresses are issued from
pub const EXTERNAL_CHAIN: u32 = 0;

/// Account-level key, either private-capable or public-only
#[derive(Clone)]
pub enum ExtendedKey {
    Private(Xpriv),
    Public(Xpub),
}

impl ExtendedKey {
    pub fn is_private(&self) -> bool {
        matches!(self, ExtendedKey::Private(_))
    }

    /// Public-only view of this key
    pub fn public(&self, secp: &Secp256k1<All>) -> Xpub {
        match self {
            ExtendedKey::Private(xpriv) => Xpub::from_priv(secp, xpriv),
            ExtendedKey::Public(xpub) => *xpub,
        }
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendedKey::Private(xpriv) => write!(f, "ExtendedKey::Private({})", xpriv.depth),
            ExtendedKey::Public(xpub) => write!(f, "ExtendedKey::Public({})", xpub.depth),
        }
    }
}

/// Stateless HD derivation over the process-wide passphrase secret
pub struct KeyDerivationEngine {
    secp: Secp256k1<All>,
    passphrase: SecretString,
}

impl KeyDerivationEngine {
    pub fn new(passphrase: SecretString) -> Self {
        Self {
            secp: Secp256k1::new(),
            passphrase,
        }
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    /// Derive `purpose'/coinType'/0'` for a coin.
    ///
    /// Fails with `Configuration` when the mnemonic is empty or invalid and
    /// with `Derivation` when a child key cannot be derived.
    pub fn derive_account(&self, profile: &CoinProfile, want_private: bool) -> WalletResult<ExtendedKey> {
        let purpose = profile.utxo_params().map(|p| p.purpose).unwrap_or(44);
        let seed = seed_from_mnemonic(&profile.mnemonic, self.passphrase.expose_secret())?;
        let account = self.account_from_seed(&seed[..], purpose, profile.kind.coin_type())?;

        if want_private {
            Ok(ExtendedKey::Private(account))
        } else {
            Ok(ExtendedKey::Public(Xpub::from_priv(&self.secp, &account)))
        }
    }

    /// Serialize the public account key with the coin's version bytes
    pub fn account_xpub(&self, account: &ExtendedKey, params: &UtxoParams) -> String {
        encode_xpub(&account.public(&self.secp), params.xpub_version)
    }

    /// Derive the external-chain address at `index`
    pub fn derive_address(&self, account: &ExtendedKey, params: &UtxoParams, index: u32) -> WalletResult<String> {
        let public_key = self.derive_public_key_at(account, EXTERNAL_CHAIN, index)?;
        Ok(encode_p2pkh(&public_key, params))
    }

    /// Public key at `chain/index` below the account
    pub fn derive_public_key_at(&self, account: &ExtendedKey, chain: u32, index: u32) -> WalletResult<PublicKey> {
        let path = child_path(chain, index)?;
        let child = account.public(&self.secp).derive_pub(&self.secp, &path)?;
        Ok(child.public_key)
    }

    /// Signing key for the external-chain address at `index`
    pub fn derive_private_key_at(&self, account: &ExtendedKey, index: u32) -> WalletResult<SecretKey> {
        self.derive_private_key_on(account, EXTERNAL_CHAIN, index)
    }

    /// Signing key at `chain/index`; requires a private-capable account key
    pub fn derive_private_key_on(&self, account: &ExtendedKey, chain: u32, index: u32) -> WalletResult<SecretKey> {
        let xpriv = match account {
            ExtendedKey::Private(xpriv) => xpriv,
            ExtendedKey::Public(_) => {
                return Err(WalletError::derivation(
                    "Private key requested from a public-only account key",
                ))
            }
        };

        let path = child_path(chain, index)?;
        let child = xpriv.derive_priv(&self.secp, &path)?;
        Ok(child.private_key)
    }

    /// Raw secret of the Ethereum-family account at `m/44'/60'/0'/0/0`.
    ///
    /// Ethereum-family accounts are seeded without the shared passphrase so
    /// they match the addresses of standard Ethereum HD wallets.
    pub fn derive_evm_secret(&self, mnemonic: &SecretString) -> WalletResult<Zeroizing<[u8; 32]>> {
        let seed = seed_from_mnemonic(mnemonic, "")?;
        let account = self.account_from_seed(&seed[..], 44, EVM_COIN_TYPE)?;
        let path = child_path(EXTERNAL_CHAIN, 0)?;
        let child = account.derive_priv(&self.secp, &path)?;
        Ok(Zeroizing::new(child.private_key.secret_bytes()))
    }

    /// Checksummed address of the Ethereum-family account for a mnemonic
    pub fn derive_evm_address(&self, mnemonic: &SecretString) -> WalletResult<String> {
        let secret = self.derive_evm_secret(mnemonic)?;
        let secret_key = SecretKey::from_slice(&secret[..])?;
        Ok(evm_address(&secret_key.public_key(&self.secp)))
    }

    fn account_from_seed(&self, seed: &[u8], purpose: u32, coin_type: u32) -> WalletResult<Xpriv> {
        let master = Xpriv::new_master(NetworkKind::Main, seed)?;
        let path = [
            ChildNumber::from_hardened_idx(purpose)?,
            ChildNumber::from_hardened_idx(coin_type)?,
            ChildNumber::from_hardened_idx(ACCOUNT_INDEX)?,
        ];
        Ok(master.derive_priv(&self.secp, &path)?)
    }
}

/// BIP39 seed from a mnemonic and passphrase
pub fn seed_from_mnemonic(mnemonic: &SecretString, passphrase: &str) -> WalletResult<Zeroizing<[u8; 64]>> {
    let phrase = mnemonic.expose_secret().trim();
    if phrase.is_empty() {
        return Err(WalletError::configuration("Mnemonic is not configured"));
    }

    let parsed = Mnemonic::parse(phrase)?;
    Ok(Zeroizing::new(parsed.to_seed(passphrase)))
}

/// Split an HD path as reported by the block-data service into
/// `(chain, index)`, e.g. `m/44'/0'/0'/0/7` -> `(0, 7)`.
pub fn parse_chain_and_index(path: &str) -> WalletResult<(u32, u32)> {
    let segments: Vec<&str> = path.trim().split('/').collect();
    if segments.len() != 6 || segments[0] != "m" {
        return Err(WalletError::tx_build(format!("Unexpected derivation path: {}", path)));
    }

    let parse = |segment: &str| {
        segment
            .parse::<u32>()
            .map_err(|_| WalletError::tx_build(format!("Invalid path segment '{}' in {}", segment, path)))
    };

    Ok((parse(segments[4])?, parse(segments[5])?))
}

/// Checksummed Ethereum address of a public key
pub fn evm_address(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    to_checksum_address(&hash[12..])
}

fn child_path(chain: u32, index: u32) -> WalletResult<[ChildNumber; 2]> {
    Ok([
        ChildNumber::from_normal_idx(chain)?,
        ChildNumber::from_normal_idx(index)?,
    ])
}
