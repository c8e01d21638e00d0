//! PKCS#11 HSM custodian.
//!
//! The vendor PKCS#11 protocol wiring itself is an external collaborator
//! (out of scope per the purpose statement); this module owns the
//! resource-scoped call sequence — init, slot check, session, login,
//! find-key, sign-init, sign, teardown in reverse order on every exit
//! path — against a small internal `Pkcs11Session` boundary that a real
//! vendor binding plugs into.

use super::{Custodian, CustodianError};
use crate::wallet::Key;

/// One open, logged-in PKCS#11 session. Implementations wrap a real
/// vendor library handle; `Drop` must release it (logout + close
/// session), matching the source's defer-based teardown.
pub trait Pkcs11Session {
    /// `true` iff `slot` is present in this library's slot list.
    fn slot_available(&self, slot: u64) -> bool;

    /// Find exactly one private-key object, optionally filtered by
    /// `label` (omit the filter when the library rejects label queries —
    /// SoftHSM is the documented example).
    fn find_private_key(&self, slot: u64, label: Option<&str>) -> Result<(), CustodianError>;

    /// Raw ECDSA sign of `digest` using the key located by
    /// `find_private_key` on the same session.
    fn sign_ecdsa(&self, slot: u64, digest: &[u8; 32]) -> Result<Vec<u8>, CustodianError>;
}

/// A library handle capable of opening sessions. Modeling `initialize`/
/// `get_slot_list`/`open_session` as a single factory keeps the
/// resource-scoped lifecycle explicit: everything downstream of
/// `open_session` is released when the returned `Pkcs11Session` is
/// dropped, and `open_session` itself is the only fallible step that
/// needs no separate teardown on the library handle (its `Drop` finalizes
/// the library).
pub trait Pkcs11Library {
    type Session: Pkcs11Session;

    fn open_session(&self, slot: u64, pin: &str) -> Result<Self::Session, CustodianError>;
}

pub struct Pkcs11Custodian<L: Pkcs11Library> {
    library: L,
    pin: String,
}

impl<L: Pkcs11Library> Pkcs11Custodian<L> {
    pub fn new(library: L, pin: String) -> Self {
        Pkcs11Custodian { library, pin }
    }
}

impl<L: Pkcs11Library> Custodian for Pkcs11Custodian<L> {
    fn sign(&self, digest: &[u8; 32], key: &Key) -> Result<[u8; 64], CustodianError> {
        let slot = key
            .hsm_slot
            .ok_or_else(|| CustodianError::Pkcs11("key has no HSM slot configured".into()))?;

        // open_session encapsulates: Initialize, GetSlotList, slot
        // verification, OpenSession(RW), Login(PIN). The returned session
        // releases all of that (Logout, CloseSession, Destroy, Finalize)
        // when dropped, regardless of how this function returns.
        let session = self.library.open_session(slot, &self.pin)?;

        if !session.slot_available(slot) {
            return Err(CustodianError::SlotNotFound(slot));
        }

        session.find_private_key(slot, key.hsm_label.as_deref())?;

        let signed = session.sign_ecdsa(slot, digest)?;
        if signed.len() != 64 {
            return Err(CustodianError::SigningFailed(format!(
                "hsm returned {} bytes, expected 64",
                signed.len()
            )));
        }
        let mut out = [0u8; 64];
        out.copy_from_slice(&signed);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Curve;
    use std::cell::Cell;

    struct FakeSession {
        available_slot: u64,
        key_found: bool,
        signature: [u8; 64],
        find_calls: Cell<u32>,
    }

    impl Pkcs11Session for FakeSession {
        fn slot_available(&self, slot: u64) -> bool {
            slot == self.available_slot
        }

        fn find_private_key(&self, _slot: u64, _label: Option<&str>) -> Result<(), CustodianError> {
            self.find_calls.set(self.find_calls.get() + 1);
            if self.key_found {
                Ok(())
            } else {
                Err(CustodianError::AmbiguousKey(0))
            }
        }

        fn sign_ecdsa(&self, _slot: u64, _digest: &[u8; 32]) -> Result<Vec<u8>, CustodianError> {
            Ok(self.signature.to_vec())
        }
    }

    struct FakeLibrary {
        session: FakeSession,
    }

    impl Pkcs11Library for FakeLibrary {
        type Session = FakeSession;

        fn open_session(&self, _slot: u64, _pin: &str) -> Result<Self::Session, CustodianError> {
            Ok(FakeSession {
                available_slot: self.session.available_slot,
                key_found: self.session.key_found,
                signature: self.session.signature,
                find_calls: Cell::new(0),
            })
        }
    }

    fn test_key(slot: u64) -> Key {
        Key {
            name: "test".into(),
            public_key_hash: "tz2test".into(),
            public_key: "sppk".into(),
            hsm_slot: Some(slot),
            hsm_label: Some("label".into()),
            kms_resource: None,
        }
    }

    #[test]
    fn signs_when_slot_and_key_found() {
        let custodian = Pkcs11Custodian::new(
            FakeLibrary {
                session: FakeSession {
                    available_slot: 0,
                    key_found: true,
                    signature: [7u8; 64],
                    find_calls: Cell::new(0),
                },
            },
            "1234".into(),
        );
        let key = test_key(0);
        assert_eq!(Curve::from_pkh(&key.public_key_hash), Curve::Secp256k1);
        let sig = custodian.sign(&[0u8; 32], &key).unwrap();
        assert_eq!(sig, [7u8; 64]);
    }

    #[test]
    fn fails_when_slot_absent() {
        let custodian = Pkcs11Custodian::new(
            FakeLibrary {
                session: FakeSession {
                    available_slot: 9,
                    key_found: true,
                    signature: [0u8; 64],
                    find_calls: Cell::new(0),
                },
            },
            "1234".into(),
        );
        let err = custodian.sign(&[0u8; 32], &test_key(0)).unwrap_err();
        assert!(matches!(err, CustodianError::SlotNotFound(0)));
    }
}
