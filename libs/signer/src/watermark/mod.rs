//! Anti-replay watermark stores: the single capability `is_safe_to_sign`
//! with four durability backends. Each backend enforces the same
//! invariant — the accepted level for a `(key_hash, chain_id, op_type)`
//! triple is strictly increasing — with a different persistence/locking
//! story.

mod file;
mod ignore;
mod remote;
mod session;

pub use file::FileWatermark;
pub use ignore::IgnoreWatermark;
pub use remote::{RemoteTable, RemoteWatermark};
pub use session::SessionWatermark;

use num_bigint::BigUint;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("watermark mutex poisoned")]
    Poisoned,
    #[error("io error persisting watermark file: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_yaml::Error),
}

impl<T> From<std::sync::PoisonError<T>> for WatermarkError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        WatermarkError::Poisoned
    }
}

/// A persisted `(key_hash, chain_id, op_type)` -> level record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WatermarkEntry {
    #[serde(rename = "Key")]
    pub key_hash: String,
    #[serde(rename = "ChainID")]
    pub chain_id: String,
    #[serde(rename = "OpType")]
    pub op_type: String,
    #[serde(rename = "Level")]
    pub level: String,
}

/// The capability every watermark backend implements. `is_safe_to_sign`
/// returns true iff `level` strictly exceeds the currently recorded level
/// for the triple, atomically recording the new level on success. If no
/// prior record exists, one is created and `true` is returned.
pub trait WatermarkStore: Send + Sync {
    fn is_safe_to_sign(
        &self,
        key_hash: &str,
        chain_id: &str,
        op_type: u8,
        level: &BigUint,
    ) -> Result<bool, WatermarkError>;
}
