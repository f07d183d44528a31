//! ERC20 transfer call encoding

use ethers_core::types::{Address, U256};

use crate::error::{WalletError, WalletResult};

/// `keccak256("transfer(address,uint256)")[..4]`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Selector + two 32-byte words
pub const TRANSFER_CALL_LEN: usize = 4 + 32 + 32;

/// Calldata for `transfer(recipient, amount)`
pub fn encode_transfer(recipient: Address, amount: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(TRANSFER_CALL_LEN);
    data.extend_from_slice(&TRANSFER_SELECTOR);

    let mut word = [0u8; 32];
    word[12..].copy_from_slice(recipient.as_bytes());
    data.extend_from_slice(&word);

    amount.to_big_endian(&mut word);
    data.extend_from_slice(&word);
    data
}

/// Recipient and amount of a `transfer` call
pub fn decode_transfer(data: &[u8]) -> WalletResult<(Address, U256)> {
    if data.len() < TRANSFER_CALL_LEN {
        return Err(WalletError::validation_mismatch(format!(
            "Token call data too short: {} bytes",
            data.len()
        )));
    }
    if data[..4] != TRANSFER_SELECTOR {
        return Err(WalletError::validation_mismatch(format!(
            "Not a transfer call: selector 0x{}",
            hex::encode(&data[..4])
        )));
    }

    let recipient = Address::from_slice(&data[16..36]);
    let amount = U256::from_big_endian(&data[36..68]);
    Ok((recipient, amount))
}

/// Parse a hex Ethereum-family address, with or without `0x`
pub fn parse_evm_address(address: &str) -> WalletResult<Address> {
    let trimmed = address.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(digits)
        .map_err(|_| WalletError::invalid_input(format!("Invalid address: {}", address)))?;
    if bytes.len() != 20 {
        return Err(WalletError::invalid_input(format!("Invalid address length: {}", address)));
    }
    Ok(Address::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::keccak256;

    #[test]
    fn test_selector_matches_signature() {
        assert_eq!(keccak256(b"transfer(address,uint256)")[..4], TRANSFER_SELECTOR);
    }

    #[test]
    fn test_encode_layout() {
        let recipient = parse_evm_address("0x673153460D01A22F9dAc129F2Ea59be3681921A4").unwrap();
        let data = encode_transfer(recipient, U256::from(3_100_000u64));

        assert_eq!(
            hex::encode(&data),
            "a9059cbb\
             000000000000000000000000673153460d01a22f9dac129f2ea59be3681921a4\
             00000000000000000000000000000000000000000000000000000000002f4d60"
        );
        assert_eq!(decode_transfer(&data).unwrap(), (recipient, U256::from(3_100_000u64)));
    }

    #[test]
    fn test_decode_rejects_other_methods() {
        let mut data = encode_transfer(Address::zero(), U256::one());
        data[0] = 0x09;
        assert!(decode_transfer(&data).is_err());
        assert!(decode_transfer(&data[..40]).is_err());
    }

    #[test]
    fn test_parse_address_variants() {
        assert!(parse_evm_address("673153460d01a22f9dac129f2ea59be3681921a4").is_ok());
        assert!(parse_evm_address("0x1234").is_err());
        assert!(parse_evm_address("0xzz3153460d01a22f9dac129f2ea59be3681921a4").is_err());
    }
}
