//! Remote signing oracle for a Tezos-like chain.
//!
//! The library is split along the same seams the request-handling flow
//! crosses: decode the operation, classify it, consult the anti-replay
//! watermark store, apply the operation filter's allow-lists and daily
//! caps, dispatch to a pluggable custodian, then re-encode the raw
//! signature bytes for the wire.
//!
//! - `base58check` / `encoding` — Tezos's Base58Check alphabet and the
//!   prefix tables for key hashes, public keys, signatures and chain ids.
//! - `curve` — per-curve signature canonicalization (low-S for the
//!   ECDSA curves, pass-through for Ed25519).
//! - `operation` — the binary operation decoder and its generic-kind view.
//! - `wallet` — the on-disk key roster.
//! - `watermark` — anti-replay stores: ignore, in-process, file-backed,
//!   and a remote compare-and-set table.
//! - `custodian` — signing backends: PKCS#11 HSM, cloud KMS, in-memory.
//! - `filter` — allow-lists and rolling daily value caps for generic ops.
//! - `orchestrator` — composes all of the above behind one entry point.
//! - `http` — the axum route layer that serves the orchestrator.

pub mod base58check;
pub mod curve;
pub mod custodian;
pub mod encoding;
pub mod filter;
pub mod http;
pub mod operation;
pub mod orchestrator;
pub mod wallet;
pub mod watermark;

pub use custodian::{Custodian, CustodianError};
pub use filter::{OperationFilter, OperationFilterConfig};
pub use operation::{DecodeError, Operation, Watermark as OperationWatermark};
pub use orchestrator::{OrchestratorError, SigningOrchestrator, StatusClass};
pub use wallet::{Key, KeyRegistry, KeyRegistryError};
pub use watermark::{WatermarkError, WatermarkStore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
