//! The static key roster: loaded once at startup from a YAML file, never
//! mutated afterward. Anti-replay state (formerly co-located here as
//! `LastBakeLevel`/`LastEndorseLevel`) lives exclusively in the watermark
//! store; this module does not track or persist signing activity.

use crate::curve::Curve;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyRegistryError {
    #[error("unable to read key file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse key file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// One authorized signing key. Immutable after load.
#[derive(Debug, Clone)]
pub struct Key {
    pub name: String,
    pub public_key_hash: String,
    pub public_key: String,
    pub hsm_slot: Option<u64>,
    pub hsm_label: Option<String>,
    /// Cloud-KMS resource name, when this key is custodied by KMS. Not part
    /// of the original source's key file shape; an additive field only
    /// consulted by the KMS custodian.
    pub kms_resource: Option<String>,
}

impl Key {
    #[must_use]
    pub fn curve(&self) -> Curve {
        Curve::from_pkh(&self.public_key_hash)
    }
}

/// In-memory roster, looked up by public-key-hash.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: HashMap<String, Key>,
}

impl KeyRegistry {
    /// Load the roster from a YAML file. Fatal (returns `Err`) if the file
    /// is unreadable or malformed, matching the startup-error contract.
    pub fn load(path: &Path) -> Result<Self, KeyRegistryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| KeyRegistryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let raw: Vec<RawKeyRecord> =
            serde_yaml::from_str(&contents).map_err(|source| KeyRegistryError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let keys = raw
            .into_iter()
            .map(|r| {
                (
                    r.public_key_hash.clone(),
                    Key {
                        name: r.name,
                        public_key_hash: r.public_key_hash,
                        public_key: r.public_key,
                        hsm_slot: r.hsm_slot,
                        hsm_label: r.hsm_label,
                        kms_resource: r.kms_resource,
                    },
                )
            })
            .collect();

        log::info!("loaded key roster from {}", path.display());
        Ok(KeyRegistry { keys })
    }

    #[must_use]
    pub fn get(&self, public_key_hash: &str) -> Option<&Key> {
        self.keys.get(public_key_hash)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Unknown fields in the YAML are ignored per the field contract; `serde`
/// does this by default (no `deny_unknown_fields`).
#[derive(Debug, Deserialize)]
struct RawKeyRecord {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "PublicKeyHash")]
    public_key_hash: String,
    #[serde(rename = "PublicKey")]
    public_key: String,
    #[serde(rename = "HsmSlot", default)]
    hsm_slot: Option<u64>,
    #[serde(rename = "HsmLabel", default)]
    hsm_label: Option<String>,
    #[serde(rename = "KmsResource", default)]
    kms_resource: Option<String>,
}
