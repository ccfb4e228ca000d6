//! # Sigil Core Library
//!
//! Core library for Sigil, a device identity registry and signed-telemetry
//! verification pipeline for edge devices publishing over a shared
//! publish/subscribe bus.
//!
//! ## Architecture
//!
//! - **Crypto**: NIST P-256 key material generation, PEM serialization,
//!   ECDSA/SHA-256 signing and verification
//! - **Canonical**: the byte-for-byte payload serialization contract shared
//!   by signer and verifier
//! - **Registry**: durable device-id → public-key mapping with
//!   register-once semantics and atomically-replaceable trust snapshots
//! - **Envelope**: the signed transport unit placed on the bus
//! - **Verify**: the per-message classification pipeline and the periodic
//!   registry refresh loop
//! - **Config**: layered configuration (defaults < file < environment)
//!
//! ## Trust model
//!
//! Devices are registered out-of-band; the verifier accepts a message only
//! when the claimed device is known and its signature checks out against
//! the registered public key. There is no connection-level trust: every
//! message carries its own proof of origin.
//!
//! The transport itself (broker lifecycle, topic routing, QoS) is an
//! external collaborator; this crate consumes raw envelope bytes and
//! produces one [`verify::VerificationResult`] per message.

pub mod canonical;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod verify;

pub use config::SigilConfig;
pub use crypto::KeyPair;
pub use envelope::{build_envelope, sign_payload, Envelope};
pub use error::{Result, SigilError};
pub use registry::{LoadOutcome, RegistryEntry, RegistryStore, SkippedEntry, SnapshotCell, TrustSnapshot};
pub use verify::{
    RefreshHandle, RefreshLoop, TracingSink, VerificationResult, VerificationSink, Verifier,
};
