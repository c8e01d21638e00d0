//! The signing orchestrator: composes decoder + filter + watermark +
//! custodian + encoder behind the `sign_request` entry point. Order is
//! significant — the watermark commit happens strictly before the
//! custodian is invoked, so a custodian that hangs or crashes never
//! leaves anti-replay state behind the caller's intent.

use crate::custodian::{Custodian, CustodianError};
use crate::curve::{self, Curve, CurveError};
use crate::encoding::{self, EncodingTableError};
use crate::filter::OperationFilter;
use crate::operation::{DecodeError, Operation, Watermark};
use crate::wallet::{Key, KeyRegistry};
use crate::watermark::{WatermarkError, WatermarkStore};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use thiserror::Error;

/// Maps 1:1 onto the HTTP status codes of the external-interface and
/// error-handling sections: this is the single place that performs that
/// mapping.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("key not found")]
    KeyNotFound,
    #[error("input error: {0}")]
    Input(#[from] DecodeError),
    #[error("policy denial")]
    PolicyDenied,
    #[error("replay denial")]
    ReplayDenied,
    #[error("custodian error: {0}")]
    Custodian(#[from] CustodianError),
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingTableError),
    #[error("watermark store error: {0}")]
    Watermark(#[from] WatermarkError),
    #[error("structural post-condition failure: signature did not match expected format")]
    StructuralFailure,
}

/// HTTP-status-shaped outcome, without depending on any HTTP crate here.
pub enum StatusClass {
    NotFound,
    BadRequest,
    Forbidden,
    ServerError,
}

impl OrchestratorError {
    #[must_use]
    pub fn status_class(&self) -> StatusClass {
        match self {
            OrchestratorError::KeyNotFound => StatusClass::NotFound,
            OrchestratorError::PolicyDenied | OrchestratorError::ReplayDenied => {
                StatusClass::Forbidden
            }
            OrchestratorError::Input(_)
            | OrchestratorError::Custodian(_)
            | OrchestratorError::Curve(_)
            | OrchestratorError::Encoding(_)
            | OrchestratorError::Watermark(_)
            | OrchestratorError::StructuralFailure => StatusClass::ServerError,
        }
    }
}

pub struct SigningOrchestrator {
    keys: KeyRegistry,
    custodian: Box<dyn Custodian>,
    watermark: Box<dyn WatermarkStore>,
    filter: OperationFilter,
}

impl SigningOrchestrator {
    pub fn new(
        keys: KeyRegistry,
        custodian: Box<dyn Custodian>,
        watermark: Box<dyn WatermarkStore>,
        filter: OperationFilter,
    ) -> Self {
        SigningOrchestrator {
            keys,
            custodian,
            watermark,
            filter,
        }
    }

    #[must_use]
    pub fn get_public_key(&self, key_hash: &str) -> Option<&str> {
        self.keys.get(key_hash).map(|k| k.public_key.as_str())
    }

    /// `sign_request(raw_bytes, key_hash) -> "<b58check signature>"`.
    pub fn sign_request(&self, raw_bytes: &[u8], key_hash: &str) -> Result<String, OrchestratorError> {
        let key = self
            .keys
            .get(key_hash)
            .ok_or(OrchestratorError::KeyNotFound)?;

        let op = Operation::parse(raw_bytes)?;

        self.check_policy(&op, key)?;

        let digest = blake2b_256(&op.hex());

        let raw_signature = self.custodian.sign(&digest, key)?;

        let curve = key.curve();
        let signature_bytes = if curve.is_ecdsa() {
            curve::strict_ec_mod_n(curve, &raw_signature)?
        } else {
            raw_signature
        };

        let prefix = encoding::signature_prefix_for(curve)?;
        let encoded = crate::base58check::encode(prefix, &signature_bytes);

        if !encoding::signature_format_valid(curve, &encoded) {
            log::error!("structural post-condition failure encoding signature for {key_hash}");
            return Err(OrchestratorError::StructuralFailure);
        }

        Ok(encoded)
    }

    fn check_policy(&self, op: &Operation, key: &Key) -> Result<(), OrchestratorError> {
        match op.watermark() {
            Watermark::Generic => {
                if self.filter.is_allowed(op) {
                    Ok(())
                } else {
                    Err(OrchestratorError::PolicyDenied)
                }
            }
            Watermark::Block | Watermark::Endorsement => {
                let chain_id = op.chain_id().unwrap_or_default();
                let level = op.level().unwrap_or_default();
                let safe = self.watermark.is_safe_to_sign(
                    &key.public_key_hash,
                    &chain_id,
                    op.watermark_byte(),
                    &level,
                )?;
                if safe {
                    Ok(())
                } else {
                    Err(OrchestratorError::ReplayDenied)
                }
            }
        }
    }
}

fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&out);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custodian::CustodianError;
    use crate::filter::OperationFilterConfig;
    use crate::watermark::SessionWatermark;
    use num_bigint::BigUint;

    struct FixedCustodian(pub [u8; 64]);

    impl Custodian for FixedCustodian {
        fn sign(&self, _digest: &[u8; 32], _key: &Key) -> Result<[u8; 64], CustodianError> {
            Ok(self.0)
        }
    }

    fn registry_with_one_key() -> KeyRegistry {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.yaml");
        std::fs::write(
            &path,
            "- Name: baker\n  PublicKeyHash: tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m\n  PublicKey: sppk\n",
        )
        .unwrap();
        KeyRegistry::load(&path).unwrap()
    }

    #[test]
    fn unknown_key_is_not_found() {
        let orchestrator = SigningOrchestrator::new(
            registry_with_one_key(),
            Box::new(FixedCustodian([0u8; 64])),
            Box::new(SessionWatermark::new()),
            OperationFilter::new(OperationFilterConfig {
                enable_generic: true,
                enable_tx: true,
                enable_voting: true,
                tx_whitelist: vec![],
                tx_daily_max: BigUint::from(u64::MAX),
            }),
        );
        let err = orchestrator
            .sign_request(b"\"03\"", "tz_unknown")
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::KeyNotFound));
    }

    #[test]
    fn malformed_payload_is_input_error() {
        let orchestrator = SigningOrchestrator::new(
            registry_with_one_key(),
            Box::new(FixedCustodian([0u8; 64])),
            Box::new(SessionWatermark::new()),
            OperationFilter::new(OperationFilterConfig {
                enable_generic: true,
                enable_tx: true,
                enable_voting: true,
                tx_whitelist: vec![],
                tx_daily_max: BigUint::from(u64::MAX),
            }),
        );
        let err = orchestrator
            .sign_request(b"not-quoted", "tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m")
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Input(_)));
    }

    #[test]
    fn endorsement_replay_is_denied_second_time() {
        let orchestrator = SigningOrchestrator::new(
            registry_with_one_key(),
            Box::new(FixedCustodian([0u8; 64])),
            Box::new(SessionWatermark::new()),
            OperationFilter::new(OperationFilterConfig {
                enable_generic: true,
                enable_tx: true,
                enable_voting: true,
                tx_whitelist: vec![],
                tx_daily_max: BigUint::from(u64::MAX),
            }),
        );

        let mut bytes = vec![0x02u8];
        bytes.extend_from_slice(&[0; 20]);
        bytes.extend_from_slice(&259_938u32.to_be_bytes());
        let payload = format!("\"{}\"", hex::encode(&bytes)).into_bytes();

        assert!(orchestrator
            .sign_request(&payload, "tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m")
            .is_ok());
        let err = orchestrator
            .sign_request(&payload, "tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m")
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ReplayDenied));
    }
}
