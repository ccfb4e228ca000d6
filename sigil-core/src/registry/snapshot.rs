//! Immutable trust snapshots and the atomically-replaceable cell the
//! refresh loop and verification pipeline share.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use p256::ecdsa::VerifyingKey;

/// An immutable, fully-built view of the identity registry at a point in
/// time. Every key it contains decoded successfully at load time.
#[derive(Debug, Clone, Default)]
pub struct TrustSnapshot {
    keys: HashMap<String, VerifyingKey>,
}

impl TrustSnapshot {
    /// Build a snapshot from a fully-decoded key index
    pub fn from_keys(keys: HashMap<String, VerifyingKey>) -> Self {
        Self { keys }
    }

    /// Resolve the public key registered for a device
    pub fn resolve(&self, device_id: &str) -> Option<&VerifyingKey> {
        self.keys.get(device_id)
    }

    /// Number of trusted devices
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no device is trusted
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sorted device ids, for operator-facing listings
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Shared handle to the current [`TrustSnapshot`].
///
/// Replacement is by-reference and total: the producer builds a complete
/// snapshot, then swaps the `Arc` under a brief write lock. Readers clone
/// the `Arc` out and verify an entire envelope against that one snapshot.
/// A concurrent refresh never changes the registry mid-verification and
/// never blocks a reader on I/O.
#[derive(Debug, Clone)]
pub struct SnapshotCell {
    inner: Arc<RwLock<Arc<TrustSnapshot>>>,
}

impl SnapshotCell {
    /// Create a cell holding the given snapshot
    pub fn new(snapshot: TrustSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// Create a cell with an empty trust set (first-run state)
    pub fn empty() -> Self {
        Self::new(TrustSnapshot::default())
    }

    /// The most recently published snapshot
    pub fn current(&self) -> Arc<TrustSnapshot> {
        self.inner.read().unwrap().clone()
    }

    /// Atomically publish a new snapshot, replacing the old one wholesale
    pub fn replace(&self, next: TrustSnapshot) {
        *self.inner.write().unwrap() = Arc::new(next);
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::empty()
    }
}
