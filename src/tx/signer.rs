//! Legacy Input Signer
//!
//! Signs P2PKH inputs with SIGHASH_ALL over the pre-segwit preimage. The
//! preimage digest is selectable per coin (double or single SHA-256).

use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::consensus::encode::serialize;
use bitcoin::ecdsa::Signature;
use bitcoin::secp256k1::{All, Message, Secp256k1, SecretKey};
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::{Script, ScriptBuf, Transaction};

use crate::error::{WalletError, WalletResult};
use crate::types::SighashAlgorithm;
use crate::utils::crypto::sighash_digest;

/// Legacy signature hash of one input.
///
/// Every input script is blanked, the signed input carries `script_code`,
/// and the sighash type is appended as a little-endian u32.
pub fn legacy_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    algorithm: SighashAlgorithm,
) -> WalletResult<[u8; 32]> {
    if input_index >= tx.input.len() {
        return Err(WalletError::tx_build(format!("Input index {} out of range", input_index)));
    }

    let mut copy = tx.clone();
    for input in copy.input.iter_mut() {
        input.script_sig = ScriptBuf::new();
        input.witness.clear();
    }
    copy.input[input_index].script_sig = script_code.to_owned();

    let mut preimage = serialize(&copy);
    preimage.extend_from_slice(&EcdsaSighashType::All.to_u32().to_le_bytes());

    Ok(sighash_digest(&preimage, algorithm))
}

/// Sign one input and install its `<sig> <pubkey>` script
pub fn sign_p2pkh_input(
    secp: &Secp256k1<All>,
    tx: &mut Transaction,
    input_index: usize,
    script_pubkey: &Script,
    secret_key: &SecretKey,
    algorithm: SighashAlgorithm,
) -> WalletResult<()> {
    let digest = legacy_sighash(tx, input_index, script_pubkey, algorithm)?;
    let message = Message::from_digest(digest);

    let signature = Signature {
        signature: secp.sign_ecdsa(&message, secret_key),
        sighash_type: EcdsaSighashType::All,
    };
    let public_key = bitcoin::PublicKey::new(secret_key.public_key(secp));

    let sig_push = PushBytesBuf::try_from(signature.to_vec())
        .map_err(|e| WalletError::tx_build(format!("Signature push failed: {}", e)))?;

    tx.input[input_index].script_sig = Builder::new()
        .push_slice(sig_push)
        .push_key(&public_key)
        .into_script();
    Ok(())
}
