//! Cloud KMS custodian: a single `asymmetric_sign` RPC. The RPC wiring is
//! an external collaborator; this module owns the request/response
//! contract (the digest field is labelled SHA-256 at the wire level even
//! though the input is BLAKE2b — the provider does not inspect the
//! bytes, it just signs what it's given).

use super::{Custodian, CustodianError};
use crate::wallet::Key;

/// The thin RPC boundary a real cloud KMS SDK plugs into.
pub trait KmsClient: Send + Sync {
    fn asymmetric_sign(&self, resource_name: &str, digest: &[u8; 32]) -> Result<Vec<u8>, CustodianError>;
}

pub struct KmsCustodian<C: KmsClient> {
    client: C,
}

impl<C: KmsClient> KmsCustodian<C> {
    pub fn new(client: C) -> Self {
        KmsCustodian { client }
    }
}

impl<C: KmsClient> Custodian for KmsCustodian<C> {
    fn sign(&self, digest: &[u8; 32], key: &Key) -> Result<[u8; 64], CustodianError> {
        let resource = key
            .kms_resource
            .as_deref()
            .ok_or_else(|| CustodianError::Kms("key has no KMS resource name configured".into()))?;

        let signed = self.client.asymmetric_sign(resource, digest)?;
        if signed.len() != 64 {
            return Err(CustodianError::SigningFailed(format!(
                "kms returned {} bytes, expected 64",
                signed.len()
            )));
        }
        let mut out = [0u8; 64];
        out.copy_from_slice(&signed);
        Ok(out)
    }
}
