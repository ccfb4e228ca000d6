//! # Registry Refresh Loop
//!
//! Periodically reloads the identity registry and atomically publishes a
//! new trust snapshot, independent of message arrival. Verifications in
//! flight keep the snapshot they started with.
//!
//! A tick whose load fails keeps the previous snapshot live: a transient
//! corrupt write to the backing document must not erase trust for every
//! device until the next good tick. The failure is logged, the loop goes
//! on.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::registry::{RegistryStore, SnapshotCell};

/// Periodic full-reload loop publishing into a [`SnapshotCell`].
#[derive(Debug)]
pub struct RefreshLoop {
    store: RegistryStore,
    snapshots: SnapshotCell,
    interval: Duration,
}

impl RefreshLoop {
    /// Create a refresh loop over the given store and snapshot cell
    pub fn new(store: RegistryStore, snapshots: SnapshotCell, interval: Duration) -> Self {
        Self {
            store,
            snapshots,
            interval,
        }
    }

    /// Run one reload-and-publish cycle.
    ///
    /// Exposed so the verifier runtime can perform its initial load
    /// synchronously before messages start flowing.
    pub fn refresh_once(store: &RegistryStore, snapshots: &SnapshotCell) {
        match store.load() {
            Ok(outcome) => {
                for entry in &outcome.skipped {
                    warn!(
                        device_id = %entry.device_id,
                        reason = %entry.reason,
                        "Registry entry skipped: key material failed to decode"
                    );
                }
                debug!(devices = outcome.snapshot.len(), "Trust snapshot published");
                snapshots.replace(outcome.snapshot);
            }
            Err(e) => {
                warn!(error = %e, "Registry reload failed, retaining previous snapshot");
            }
        }
    }

    /// Spawn the loop as a background task.
    ///
    /// The first tick fires immediately. The returned handle stops the
    /// loop between ticks; a tick in progress always completes.
    pub fn spawn(self) -> RefreshHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let Self {
            store,
            snapshots,
            interval,
        } = self;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        Self::refresh_once(&store, &snapshots);
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Registry refresh loop stopped");
                        break;
                    }
                }
            }
        });

        RefreshHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle for a running [`RefreshLoop`]. Dropping it without calling
/// [`RefreshHandle::shutdown`] leaves the loop running for the lifetime of
/// the runtime.
#[derive(Debug)]
pub struct RefreshHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop scheduling further ticks and wait for the task to exit
    pub async fn shutdown(self) {
        // Receiver may already be gone if the task panicked; join below
        // surfaces nothing either way.
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
