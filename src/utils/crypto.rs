//! Hashing helpers shared by the UTXO and Ethereum-family code paths

use bitcoin::hashes::{sha256, sha256d, Hash};
use tiny_keccak::{Hasher, Keccak};

use crate::types::SighashAlgorithm;

/// Keccak256 hash (used for Ethereum addresses and selectors)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Convert raw address bytes to checksummed Ethereum address
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::from("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if ch.is_ascii_digit() || nibble < 8 {
            result.push(ch);
        } else {
            result.push(ch.to_ascii_uppercase());
        }
    }

    result
}

/// Digest a sighash preimage with the coin's designated primitive
pub fn sighash_digest(preimage: &[u8], algorithm: SighashAlgorithm) -> [u8; 32] {
    match algorithm {
        SighashAlgorithm::Sha256d => sha256d::Hash::hash(preimage).to_byte_array(),
        SighashAlgorithm::Sha256 => sha256::Hash::hash(preimage).to_byte_array(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_checksum_address() {
        let raw = hex::decode("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(
            to_checksum_address(&raw),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn test_single_and_double_sha_differ() {
        let single = sighash_digest(b"abc", SighashAlgorithm::Sha256);
        let double = sighash_digest(b"abc", SighashAlgorithm::Sha256d);
        assert_eq!(
            hex::encode(single),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(single, double);
    }
}
