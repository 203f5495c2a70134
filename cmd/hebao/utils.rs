use std::path::Path;

use bytes::Bytes;
use hebao_common::U256;
use hex::FromHexError;
use secp256k1::SecretKey;
use serde::de::DeserializeOwned;

pub fn parse_private_key(s: &str) -> eyre::Result<SecretKey> {
    Ok(SecretKey::from_slice(&parse_hex(s)?)?)
}

pub fn parse_hex(s: &str) -> eyre::Result<Bytes, FromHexError> {
    match s.strip_prefix("0x") {
        Some(s) => hex::decode(s).map(Into::into),
        None => hex::decode(s).map(Into::into),
    }
}

/// Decimal, or hexadecimal when prefixed with `0x`.
pub fn parse_u256(s: &str) -> eyre::Result<U256> {
    match s.strip_prefix("0x") {
        Some(hex) => Ok(U256::from_str_radix(hex, 16)?),
        None => Ok(U256::from_dec_str(s)?),
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> eyre::Result<T> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| eyre::eyre!("Failed to read {}: {err}", path.display()))?;
    Ok(serde_json::from_str(&contents)?)
}
