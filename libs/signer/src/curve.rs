//! Curve identification and low-S (BIP-62 style) canonicalization.

use num_bigint::BigUint;
use num_traits::Num;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurveError {
    #[error("raw ECDSA signature must be exactly 64 bytes, got {0}")]
    WrongSignatureLength(usize),
    #[error("R or S component exceeded 32 bytes after reduction, custodian bug")]
    ComponentOverflow,
}

/// The four curve identities a public-key-hash prefix can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    Ed25519,
    Secp256k1,
    NistP256,
    Unknown,
}

impl Curve {
    /// Identify the curve from a `tz1`/`tz2`/`tz3` public-key-hash string.
    #[must_use]
    pub fn from_pkh(pkh: &str) -> Self {
        if pkh.starts_with("tz1") {
            Curve::Ed25519
        } else if pkh.starts_with("tz2") {
            Curve::Secp256k1
        } else if pkh.starts_with("tz3") {
            Curve::NistP256
        } else {
            Curve::Unknown
        }
    }

    #[must_use]
    pub fn is_ecdsa(self) -> bool {
        matches!(self, Curve::Secp256k1 | Curve::NistP256)
    }
}

fn secp256k1_order() -> BigUint {
    BigUint::from_str_radix(
        "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
        16,
    )
    .expect("constant is valid hex")
}

fn p256_order() -> BigUint {
    BigUint::from_str_radix(
        "FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551",
        16,
    )
    .expect("constant is valid hex")
}

fn leftpad32(value: &BigUint) -> Result<[u8; 32], CurveError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(CurveError::ComponentOverflow);
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

/// Canonicalize a raw 64-byte `R || S` ECDSA signature so that
/// `S <= n/2` for the curve's order `n`. Ed25519 is not ECDSA and is
/// handled by the caller (this function is only invoked for ECDSA curves).
///
/// `sig` must be exactly 64 bytes; anything else is a custodian bug and is
/// rejected rather than silently truncated or padded.
pub fn strict_ec_mod_n(curve: Curve, sig: &[u8]) -> Result<[u8; 64], CurveError> {
    if sig.len() != 64 {
        return Err(CurveError::WrongSignatureLength(sig.len()));
    }

    let order = match curve {
        Curve::Secp256k1 => secp256k1_order(),
        Curve::NistP256 => p256_order(),
        Curve::Ed25519 | Curve::Unknown => {
            let mut out = [0u8; 64];
            out.copy_from_slice(sig);
            return Ok(out);
        }
    };

    let r = BigUint::from_bytes_be(&sig[..32]);
    let mut s = BigUint::from_bytes_be(&sig[32..]);
    let half = &order >> 1u32;
    if s > half {
        s = &order - &s;
    }

    let r_bytes = leftpad32(&r)?;
    let s_bytes = leftpad32(&s)?;

    let mut out = [0u8; 64];
    out[..32].copy_from_slice(&r_bytes);
    out[32..].copy_from_slice(&s_bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pkh_prefixes() {
        assert_eq!(Curve::from_pkh("tz1abc"), Curve::Ed25519);
        assert_eq!(Curve::from_pkh("tz2abc"), Curve::Secp256k1);
        assert_eq!(Curve::from_pkh("tz3abc"), Curve::NistP256);
        assert_eq!(Curve::from_pkh("tz4abc"), Curve::Unknown);
    }

    #[test]
    fn ed25519_passes_through_unchanged() {
        let sig = [9u8; 64];
        let out = strict_ec_mod_n(Curve::Ed25519, &sig).unwrap();
        assert_eq!(out, sig);
    }

    #[test]
    fn rejects_non_64_byte_input() {
        let err = strict_ec_mod_n(Curve::Secp256k1, &[0u8; 63]).unwrap_err();
        assert_eq!(err, CurveError::WrongSignatureLength(63));
    }

    #[test]
    fn high_s_is_negated_mod_n() {
        let order = secp256k1_order();
        let high_s = &order - BigUint::from(1u32);
        let mut sig = vec![1u8; 32];
        sig.extend_from_slice(&leftpad32(&high_s).unwrap());
        let out = strict_ec_mod_n(Curve::Secp256k1, &sig).unwrap();
        let s_out = BigUint::from_bytes_be(&out[32..]);
        assert_eq!(s_out, BigUint::from(1u32));
        assert!(s_out <= &order >> 1u32);
    }

    #[test]
    fn low_s_already_canonical_is_unchanged() {
        let mut sig = vec![2u8; 32];
        sig.extend_from_slice(&[0u8; 31]);
        sig.push(5);
        let out = strict_ec_mod_n(Curve::NistP256, &sig).unwrap();
        assert_eq!(&out[32..], &sig[32..]);
    }
}
