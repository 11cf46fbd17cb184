//! Byte encoding of item keys for ordered engines.
//!
//! Layout: `{pk} 0x00 {sk}`. All items of a partition are contiguous and
//! ordered by sort key, and `{pk} 0x00 {prefix}` addresses every sort key
//! beginning with `prefix`. Key values containing NUL are rejected.

use crate::error::{Result, StorageError};
use facetdb_commons::ItemKey;

const SEPARATOR: u8 = 0x00;

/// Never occurs in UTF-8, so it sorts after every sort key.
const UPPER_SENTINEL: u8 = 0xFF;

/// Encode a full item key: `{pk}\0{sk}`
pub fn encode_key(key: &ItemKey) -> Result<Vec<u8>> {
    encode_prefix(&key.pk, &key.sk)
}

/// Encode a partition key plus sort-key prefix: `{pk}\0{sk_prefix}`
pub fn encode_prefix(pk: &str, sk_prefix: &str) -> Result<Vec<u8>> {
    check_component("partition key", pk)?;
    check_component("sort key", sk_prefix)?;

    let mut bytes = Vec::with_capacity(pk.len() + 1 + sk_prefix.len());
    bytes.extend_from_slice(pk.as_bytes());
    bytes.push(SEPARATOR);
    bytes.extend_from_slice(sk_prefix.as_bytes());
    Ok(bytes)
}

/// Smallest encoded key strictly greater than every key under `prefix`.
pub fn prefix_upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut bound = prefix.to_vec();
    bound.push(UPPER_SENTINEL);
    bound
}

fn check_component(what: &str, value: &str) -> Result<()> {
    if value.as_bytes().contains(&SEPARATOR) {
        return Err(StorageError::InvalidKey(format!(
            "{} must not contain NUL bytes: {:?}",
            what, value
        )));
    }
    Ok(())
}
