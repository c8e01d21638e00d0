//! Base58Check encoding/decoding, SHA-256 squared checksum.
//!
//! Tezos prefixes are multi-byte tags chosen so the base58 text always
//! starts with a fixed, human-recognizable string (`tz1`, `edsig`, ...).

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from base58check encode/decode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("base58 decode error: {0}")]
    Base58(String),
    #[error("decoded payload shorter than prefix + checksum")]
    TooShort,
    #[error("decoded payload does not start with the expected prefix")]
    WrongPrefix,
    #[error("checksum mismatch")]
    BadChecksum,
}

/// Encode `prefix || data` with a double-SHA256 checksum, base58-encoded.
#[must_use]
pub fn encode(prefix: &[u8], data: &[u8]) -> String {
    let mut payload = Vec::with_capacity(prefix.len() + data.len() + 4);
    payload.extend_from_slice(prefix);
    payload.extend_from_slice(data);

    let checksum = compute_checksum(&payload);
    payload.extend_from_slice(&checksum[..4]);

    bs58::encode(&payload).into_string()
}

/// Decode a base58check string, verifying `prefix` and the checksum, and
/// returning the payload with both stripped.
pub fn decode(s: &str, prefix: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let decoded = bs58::decode(s)
        .into_vec()
        .map_err(|e| EncodingError::Base58(e.to_string()))?;

    if decoded.len() < prefix.len() + 4 {
        return Err(EncodingError::TooShort);
    }

    if &decoded[..prefix.len()] != prefix {
        return Err(EncodingError::WrongPrefix);
    }

    let data_end = decoded.len() - 4;
    let data_with_prefix = &decoded[..data_end];
    let checksum = &decoded[data_end..];

    let computed_checksum = compute_checksum(data_with_prefix);
    if checksum != &computed_checksum[..4] {
        return Err(EncodingError::BadChecksum);
    }

    Ok(decoded[prefix.len()..data_end].to_vec())
}

fn compute_checksum(data: &[u8]) -> [u8; 32] {
    let first_hash = Sha256::digest(data);
    let second_hash = Sha256::digest(first_hash);
    let mut checksum = [0u8; 32];
    checksum.copy_from_slice(&second_hash);
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let prefix = &[0x06, 0xa1, 0xa4];
        let data = &[
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20,
        ];

        let encoded = encode(prefix, data);
        let decoded = decode(&encoded, prefix).unwrap();

        assert_eq!(data, &decoded[..]);
    }

    #[test]
    fn invalid_checksum() {
        let encoded = "tz4InvalidChecksum";
        let prefix = &[0x06, 0xa1, 0xa4];
        let result = decode(encoded, prefix);
        assert!(result.is_err());
    }

    #[test]
    fn wrong_prefix_rejected() {
        let encoded = encode(&[0x06, 0xa1, 0xa4], &[1, 2, 3]);
        let err = decode(&encoded, &[0x06, 0xa1, 0xa1]).unwrap_err();
        assert_eq!(err, EncodingError::WrongPrefix);
    }
}
