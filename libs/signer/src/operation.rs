//! Quoted-hex operation decoding: watermark-byte classification, block and
//! endorsement level/chain-id extraction, and the generic-operation
//! transaction view.
//!
//! Top-level parse errors (missing quotes, bad hex, unknown watermark byte)
//! are fatal to the whole parse. Anything past that point — an offset
//! running past the end of the buffer, a destination padding mismatch — is
//! logged and reported as a neutral value so a malformed operation still
//! reaches the filter, which is the layer responsible for rejecting it.

use crate::encoding;
use num_bigint::BigUint;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("input is not enclosed in double quotes")]
    NotQuoted,
    #[error("hex interior has odd length")]
    OddLength,
    #[error("hex interior contains non-hex characters")]
    InvalidHex,
    #[error("empty operation, no watermark byte")]
    Empty,
    #[error("unknown watermark byte 0x{0:02x}")]
    UnknownWatermark(u8),
}

/// The first byte of every operation, classifying it as block, endorsement,
/// or generic. Called "magic byte" or "op-type" elsewhere in the source
/// material; this is the single representation of that one concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Watermark {
    Block = 0x01,
    Endorsement = 0x02,
    Generic = 0x03,
}

impl Watermark {
    fn from_byte(b: u8) -> Result<Self, DecodeError> {
        match b {
            0x01 => Ok(Watermark::Block),
            0x02 => Ok(Watermark::Endorsement),
            0x03 => Ok(Watermark::Generic),
            other => Err(DecodeError::UnknownWatermark(other)),
        }
    }
}

pub const KIND_PROPOSALS: u8 = 0x05;
pub const KIND_BALLOT: u8 = 0x06;
pub const KIND_TRANSACTION: u8 = 0x08;

/// A decoded signing request. Immutable after parse; `hex()` returns a
/// defensive copy of the raw bytes.
#[derive(Debug, Clone)]
pub struct Operation {
    raw: Vec<u8>,
    watermark: Watermark,
}

impl Operation {
    /// Parse a quoted-hex payload (after trimming ASCII whitespace at the
    /// edges) into a classified operation.
    pub fn parse(input: &[u8]) -> Result<Self, DecodeError> {
        let trimmed = trim_ascii_whitespace(input);
        if trimmed.len() < 2 || trimmed[0] != b'"' || trimmed[trimmed.len() - 1] != b'"' {
            return Err(DecodeError::NotQuoted);
        }
        let interior = &trimmed[1..trimmed.len() - 1];
        if interior.len() % 2 != 0 {
            return Err(DecodeError::OddLength);
        }
        let raw = hex_decode(interior).ok_or(DecodeError::InvalidHex)?;
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }
        let watermark = Watermark::from_byte(raw[0])?;
        Ok(Operation { raw, watermark })
    }

    #[must_use]
    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    #[must_use]
    pub fn watermark_byte(&self) -> u8 {
        self.watermark as u8
    }

    /// Defensive copy of the raw operation bytes.
    #[must_use]
    pub fn hex(&self) -> Vec<u8> {
        self.raw.clone()
    }

    /// `base58check(chain_id_prefix, bytes[1..5])`. Valid for Block and
    /// Endorsement; for Generic the same bytes are read if present (a
    /// generic operation has no chain id field in this scheme, so callers
    /// should not invoke this for Generic operations).
    pub fn chain_id(&self) -> Option<String> {
        if self.raw.len() < 5 {
            log::warn!("operation too short to contain a chain id");
            return None;
        }
        Some(encoding::chain_id_b58check(&self.raw[1..5]))
    }

    /// Chain height, valid only for Block and Endorsement.
    #[must_use]
    pub fn level(&self) -> Option<BigUint> {
        match self.watermark {
            Watermark::Block => {
                if self.raw.len() < 9 {
                    log::warn!("block operation too short to contain a level");
                    return None;
                }
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&self.raw[5..9]);
                Some(BigUint::from(u32::from_be_bytes(bytes)))
            }
            Watermark::Endorsement => {
                if self.raw.len() < 4 {
                    log::warn!("endorsement too short to contain a level");
                    return None;
                }
                let tail = &self.raw[self.raw.len() - 4..];
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(tail);
                Some(BigUint::from(u32::from_be_bytes(bytes)))
            }
            Watermark::Generic => None,
        }
    }

    /// A view over the inner transaction/ballot/proposal fields. `None` if
    /// this operation is not `Generic` or is too short to contain the kind
    /// byte at offset 33.
    #[must_use]
    pub fn generic(&self) -> Option<GenericOperation<'_>> {
        if self.watermark != Watermark::Generic || self.raw.len() <= 33 {
            return None;
        }
        Some(GenericOperation { raw: &self.raw })
    }
}

/// Decode a single little-endian, 7-bit-per-byte, high-bit-continuation
/// varint starting at `offset`. Returns the parsed value and the offset of
/// the next byte. Running off the end of `data` yields `(0, data.len())`
/// with a warning rather than failing the whole parse.
#[must_use]
pub fn parse_varint(data: &[u8], offset: usize) -> (BigUint, usize) {
    parse_varint_rec(data, offset, 0)
}

fn parse_varint_rec(data: &[u8], offset: usize, shift: u32) -> (BigUint, usize) {
    let Some(&byte) = data.get(offset) else {
        log::warn!("varint decode ran past end of buffer at offset {offset}");
        return (BigUint::from(0u32), offset);
    };

    let value = BigUint::from(u32::from(byte & 0x7f)) << (7 * shift);

    if byte & 0x80 == 0 {
        (value, offset + 1)
    } else {
        let (rest, next) = parse_varint_rec(data, offset + 1, shift + 1);
        (value + rest, next)
    }
}

/// A view over the inner contents of a `Generic` operation, starting with
/// the kind byte at offset 33.
pub struct GenericOperation<'a> {
    raw: &'a [u8],
}

impl GenericOperation<'_> {
    #[must_use]
    pub fn kind(&self) -> u8 {
        self.raw[33]
    }

    /// 20-byte transaction source hash, hex-encoded. Empty if the buffer is
    /// too short.
    #[must_use]
    pub fn transaction_source(&self) -> String {
        if self.raw.len() < 56 {
            log::warn!("generic operation too short for transaction source");
            return String::new();
        }
        hex::encode(&self.raw[36..56])
    }

    fn numbers(&self) -> (BigUint, BigUint, BigUint, BigUint, BigUint, usize) {
        let mut offset = 56;
        let mut next = |o: usize| -> (BigUint, usize) {
            let (v, n) = parse_varint(self.raw, o);
            (v, n)
        };
        let (fee, o1) = next(offset);
        offset = o1;
        let (counter, o2) = next(offset);
        offset = o2;
        let (gas_limit, o3) = next(offset);
        offset = o3;
        let (storage_limit, o4) = next(offset);
        offset = o4;
        let (amount, o5) = next(offset);
        offset = o5;
        (fee, counter, gas_limit, storage_limit, amount, offset)
    }

    #[must_use]
    pub fn transaction_fee(&self) -> BigUint {
        self.numbers().0
    }

    #[must_use]
    pub fn transaction_counter(&self) -> BigUint {
        self.numbers().1
    }

    #[must_use]
    pub fn transaction_gas_limit(&self) -> BigUint {
        self.numbers().2
    }

    #[must_use]
    pub fn transaction_storage_limit(&self) -> BigUint {
        self.numbers().3
    }

    #[must_use]
    pub fn transaction_amount(&self) -> BigUint {
        self.numbers().4
    }

    /// `fee + gas_limit + storage_limit + amount`, the value the filter
    /// compares against the daily transaction cap.
    #[must_use]
    pub fn transaction_value(&self) -> BigUint {
        let (fee, _counter, gas_limit, storage_limit, amount, _next) = self.numbers();
        fee + gas_limit + storage_limit + amount
    }

    /// 20-byte destination hash, hex-encoded. Empty (with a warning) if the
    /// gap between the end of the number run and the start of the
    /// destination is not exactly 2 bytes — this is non-fatal by design:
    /// the filter, not the decoder, is responsible for rejecting an
    /// operation with an unresolvable destination.
    #[must_use]
    pub fn transaction_destination(&self) -> String {
        let (_fee, _counter, _gas_limit, _storage_limit, _amount, number_end) = self.numbers();
        if self.raw.len() < 21 {
            log::warn!("generic operation too short for a destination");
            return String::new();
        }
        let start = self.raw.len() - 21;
        let end = self.raw.len() - 1;
        if start < number_end || start - number_end != 2 {
            log::warn!(
                "destination offset mismatch: expected 2 bytes of padding, got {}",
                start.saturating_sub(number_end)
            );
            return String::new();
        }
        hex::encode(&self.raw[start..end])
    }
}

fn trim_ascii_whitespace(input: &[u8]) -> &[u8] {
    let start = input.iter().position(|b| !b.is_ascii_whitespace());
    let Some(start) = start else {
        return &[];
    };
    let end = input.iter().rposition(|b| !b.is_ascii_whitespace()).unwrap();
    &input[start..=end]
}

fn hex_decode(interior: &[u8]) -> Option<Vec<u8>> {
    let s = std::str::from_utf8(interior).ok()?;
    hex::decode(s).ok()
}
