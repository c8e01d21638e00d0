//! In-memory Ed25519 custodian. Holds a plaintext private key; intended
//! for tests only.

use super::{Custodian, CustodianError};
use crate::encoding::PKH_ED25519;
use crate::wallet::Key;
use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signer, SigningKey};

type Blake2b20 = Blake2b<U20>;

pub struct MemoryCustodian {
    signing_key: SigningKey,
    public_key_hash: String,
}

impl MemoryCustodian {
    #[must_use]
    pub fn new(signing_key: SigningKey) -> Self {
        let public_key_hash = derive_pkh(&signing_key);
        MemoryCustodian {
            signing_key,
            public_key_hash,
        }
    }

    /// Generate a fresh key, for use in tests and fixtures.
    #[must_use]
    pub fn generate(rng: &mut impl rand_core::CryptoRngCore) -> Self {
        Self::new(SigningKey::generate(rng))
    }

    #[must_use]
    pub fn public_key_hash(&self) -> &str {
        &self.public_key_hash
    }
}

fn derive_pkh(signing_key: &SigningKey) -> String {
    let verifying_key = signing_key.verifying_key();
    let mut hasher = Blake2b20::new();
    hasher.update(verifying_key.as_bytes());
    let hash = hasher.finalize();
    crate::base58check::encode(&PKH_ED25519, &hash)
}

impl Custodian for MemoryCustodian {
    fn sign(&self, digest: &[u8; 32], key: &Key) -> Result<[u8; 64], CustodianError> {
        if key.public_key_hash != self.public_key_hash {
            return Err(CustodianError::KeyMismatch {
                requested: key.public_key_hash.clone(),
                actual: self.public_key_hash.clone(),
            });
        }
        let signature = self.signing_key.sign(digest);
        Ok(signature.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn signs_when_pkh_matches() {
        let custodian = MemoryCustodian::generate(&mut OsRng);
        let key = Key {
            name: "mem".into(),
            public_key_hash: custodian.public_key_hash().to_string(),
            public_key: String::new(),
            hsm_slot: None,
            hsm_label: None,
            kms_resource: None,
        };
        let sig = custodian.sign(&[5u8; 32], &key).unwrap();
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn rejects_mismatched_pkh() {
        let custodian = MemoryCustodian::generate(&mut OsRng);
        let key = Key {
            name: "wrong".into(),
            public_key_hash: "tz1SomeOtherHash".into(),
            public_key: String::new(),
            hsm_slot: None,
            hsm_label: None,
            kms_resource: None,
        };
        assert!(custodian.sign(&[0u8; 32], &key).is_err());
    }
}
