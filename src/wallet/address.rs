//! Per-coin address encoding
//!
//! Address encode/decode is a pure function of a coin's `UtxoParams`.
//! Two coins with different version bytes can be handled side by side
//! without touching any shared network registry.

use bitcoin::base58;
use bitcoin::bip32::Xpub;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::PublicKey;
use bitcoin::{PubkeyHash, ScriptBuf, ScriptHash, WPubkeyHash, WScriptHash};

use crate::error::{WalletError, WalletResult};
use crate::types::UtxoParams;

/// Encode a compressed public key as a base58check P2PKH address
pub fn encode_p2pkh(public_key: &PublicKey, params: &UtxoParams) -> String {
    let hash = bitcoin::PublicKey::new(*public_key).pubkey_hash();
    encode_with_version(params.p2pkh_version, &hash.to_byte_array())
}

/// Serialize an account key with the coin's extended-public-key version bytes
pub fn encode_xpub(xpub: &Xpub, version: u32) -> String {
    let mut raw = xpub.encode();
    raw[..4].copy_from_slice(&version.to_be_bytes());
    base58::encode_check(&raw)
}

/// Resolve the locking script an address stands for.
///
/// Accepts base58 P2PKH/P2SH with the coin's own version bytes and, when
/// the coin declares a bech32 prefix, native segwit v0 payees.
pub fn script_for_address(address: &str, params: &UtxoParams) -> WalletResult<ScriptBuf> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(WalletError::tx_build("Empty address"));
    }

    if let Some(hrp) = params.bech32_hrp.as_deref() {
        let lower = trimmed.to_lowercase();
        if lower.starts_with(&format!("{}1", hrp)) {
            return decode_segwit(&lower, hrp);
        }
    }

    let decoded = base58::decode_check(trimmed)
        .map_err(|e| WalletError::tx_build(format!("Invalid base58 address: {}", e)))?;

    if decoded.len() != 21 {
        return Err(WalletError::tx_build(format!(
            "Invalid address payload length: {}",
            decoded.len()
        )));
    }

    let version = decoded[0];
    let hash: [u8; 20] = decoded[1..]
        .try_into()
        .map_err(|_| WalletError::tx_build("Invalid address hash"))?;

    if version == params.p2pkh_version {
        Ok(ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)))
    } else if version == params.p2sh_version {
        Ok(ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)))
    } else {
        Err(WalletError::tx_build(format!(
            "Unknown address version 0x{:02X} for this coin",
            version
        )))
    }
}

fn encode_with_version(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 1);
    data.push(version);
    data.extend_from_slice(payload);
    base58::encode_check(&data)
}

fn decode_segwit(address: &str, expected_hrp: &str) -> WalletResult<ScriptBuf> {
    use bech32::FromBase32;

    let (hrp, data, variant) = bech32::decode(address)
        .map_err(|e| WalletError::tx_build(format!("Invalid bech32 address: {}", e)))?;

    if hrp != expected_hrp {
        return Err(WalletError::tx_build(format!("Unexpected address prefix: {}", hrp)));
    }

    let (version, program) = data
        .split_first()
        .ok_or_else(|| WalletError::tx_build("Empty bech32 data"))?;
    let version = version.to_u8();
    let program = Vec::<u8>::from_base32(program)
        .map_err(|e| WalletError::tx_build(format!("Invalid witness program: {}", e)))?;

    if version != 0 || variant != bech32::Variant::Bech32 {
        return Err(WalletError::tx_build(format!(
            "Unsupported witness version {}",
            version
        )));
    }

    match program.len() {
        20 => {
            let hash: [u8; 20] = program
                .try_into()
                .map_err(|_| WalletError::tx_build("Invalid witness program"))?;
            Ok(ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(hash)))
        }
        32 => {
            let hash: [u8; 32] = program
                .try_into()
                .map_err(|_| WalletError::tx_build("Invalid witness program"))?;
            Ok(ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array(hash)))
        }
        n => Err(WalletError::tx_build(format!(
            "Unsupported witness program length {}",
            n
        ))),
    }
}
