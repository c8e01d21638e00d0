//! Tezos prefix tables and curve-keyed signature formatting.
//!
//! Prefix bytes are taken verbatim from the upstream signer's constant
//! table: each is the fixed lead-in that makes a base58check string decode
//! to a human-recognizable tag (`tz1...`, `edsig...`, ...).

use crate::curve::Curve;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingTableError {
    #[error("unknown curve, no signature prefix defined")]
    UnknownCurve,
}

pub const PKH_ED25519: [u8; 3] = [0x06, 0xa1, 0x9f];
pub const PKH_SECP256K1: [u8; 3] = [0x06, 0xa1, 0xa1];
pub const PKH_P256: [u8; 3] = [0x06, 0xa1, 0xa4];

pub const PUBKEY_ED25519: [u8; 4] = [0x0d, 0x0f, 0x25, 0xd9];
pub const PUBKEY_SECP256K1: [u8; 4] = [0x03, 0xfe, 0xe2, 0x56];
pub const PUBKEY_P256: [u8; 4] = [0x03, 0xb2, 0x8b, 0x7f];

pub const SECRET_KEY_ED25519: [u8; 4] = [0x0d, 0x0f, 0x3a, 0x07];
pub const SECRET_KEY_SECP256K1: [u8; 4] = [0x11, 0xa2, 0xe0, 0xc9];
pub const SECRET_KEY_P256: [u8; 4] = [0x10, 0x51, 0xee, 0xbd];

pub const SIG_ED25519: [u8; 5] = [0x09, 0xf5, 0xcd, 0x86, 0x12];
pub const SIG_SECP256K1: [u8; 5] = [0x0d, 0x73, 0x65, 0x13, 0x3f];
pub const SIG_P256: [u8; 4] = [0x36, 0xf0, 0x2c, 0x34];
pub const SIG_GENERIC: [u8; 3] = [0x04, 0x82, 0x2b];

pub const CHAIN_ID: [u8; 3] = [0x57, 0x52, 0x00];

/// Returns the textual signature prefix (`edsig`, `spsig1`, `p2sig`, or the
/// generic `sig` tag) for `curve`.
pub fn signature_prefix_for(curve: Curve) -> Result<&'static [u8], EncodingTableError> {
    match curve {
        Curve::Ed25519 => Ok(&SIG_ED25519),
        Curve::Secp256k1 => Ok(&SIG_SECP256K1),
        Curve::NistP256 => Ok(&SIG_P256),
        Curve::Unknown => Err(EncodingTableError::UnknownCurve),
    }
}

/// Structural check: does `encoded` start with the right textual prefix and
/// have the right length for `curve`? Does not verify the signature itself.
#[must_use]
pub fn signature_format_valid(curve: Curve, encoded: &str) -> bool {
    match curve {
        Curve::Ed25519 => encoded.starts_with("edsig") && encoded.len() == 99,
        Curve::Secp256k1 => encoded.starts_with("spsig1") && encoded.len() == 99,
        Curve::NistP256 => encoded.starts_with("p2sig") && encoded.len() == 98,
        Curve::Unknown => encoded.starts_with("sig") && encoded.len() == 96,
    }
}

/// Base58check-encode a 20-byte hash under the Tezos chain-id prefix.
#[must_use]
pub fn chain_id_b58check(chain_id_bytes: &[u8]) -> String {
    crate::base58check::encode(&CHAIN_ID, chain_id_bytes)
}

/// Strip the 3-byte prefix and 4-byte checksum from a base58check public
/// key hash, returning the inner 20 raw bytes.
pub fn pubkey_hash_to_bytes(b58_address: &str) -> Result<[u8; 20], EncodingTableError> {
    for prefix in [PKH_ED25519, PKH_SECP256K1, PKH_P256] {
        if let Ok(bytes) = crate::base58check::decode(b58_address, &prefix) {
            if bytes.len() == 20 {
                let mut out = [0u8; 20];
                out.copy_from_slice(&bytes);
                return Ok(out);
            }
        }
    }
    Err(EncodingTableError::UnknownCurve)
}
