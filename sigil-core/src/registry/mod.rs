//! # Identity Registry
//!
//! Durable mapping from device identifier to public key, with
//! register-once semantics and full-reload snapshots.
//!
//! ## Design principles
//!
//! - **Register once**: registration is the only mutating operation; an id
//!   that exists is rejected, never overwritten
//! - **Typed entries**: the backing document decodes into
//!   [`RegistryEntry`] records; entries whose PEM fails to decode are
//!   skipped and surfaced, never silently dropped into the trust set
//! - **Immutable snapshots**: a load builds a complete [`TrustSnapshot`]
//!   off to the side; [`SnapshotCell`] swaps the shared reference
//!   wholesale, so a reader never observes a half-built registry

pub mod snapshot;
pub mod store;

pub use snapshot::{SnapshotCell, TrustSnapshot};
pub use store::{LoadOutcome, RegistryEntry, RegistryStore, SkippedEntry};
