use ethereum_types::{Address, U256};
use hex::FromHexError;

pub use keccak_hash::keccak;

pub fn decode_hex(hex: &str) -> Result<Vec<u8>, FromHexError> {
    let trimmed = hex.strip_prefix("0x").unwrap_or(hex);
    hex::decode(trimmed)
}

/// Left-pads an address to a 32-byte ABI word.
pub fn address_to_word(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Big-endian bytes of `value` without leading zeros, as RLP expects integers.
pub fn u256_to_trimmed_bytes(value: U256) -> Vec<u8> {
    let bytes = value.to_big_endian();
    let first_non_zero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first_non_zero..].to_vec()
}
