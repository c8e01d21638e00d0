//! The signing capability: a single `sign(digest, key) -> 64 raw bytes`
//! method, with three concrete backends differing only in how they
//! produce that output.

mod kms;
mod memory;
mod pkcs11;

pub use kms::{KmsClient, KmsCustodian};
pub use memory::MemoryCustodian;
pub use pkcs11::{Pkcs11Custodian, Pkcs11Library, Pkcs11Session};

use crate::wallet::Key;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CustodianError {
    #[error("pkcs#11 error: {0}")]
    Pkcs11(String),
    #[error("requested slot {0} is not present on this token")]
    SlotNotFound(u64),
    #[error("key lookup found {0} matching objects, expected exactly 1")]
    AmbiguousKey(usize),
    #[error("kms rpc failed: {0}")]
    Kms(String),
    #[error("key hash mismatch: requested {requested}, held key hashes to {actual}")]
    KeyMismatch { requested: String, actual: String },
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// `sign(digest, key) -> signature_bytes`. The digest is always the
/// 32-byte BLAKE2b-256 of the raw operation bytes. The returned signature
/// is 64 raw bytes for every supported curve.
pub trait Custodian: Send + Sync {
    fn sign(&self, digest: &[u8; 32], key: &Key) -> Result<[u8; 64], CustodianError>;
}
