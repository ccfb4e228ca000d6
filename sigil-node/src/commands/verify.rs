//! The verifier runtime.
//!
//! Performs the initial registry load, starts the refresh loop, then
//! classifies newline-delimited envelopes from stdin, the narrow seam
//! where the external bus subscription hands over raw message bytes.
//! Shuts the refresh loop down cleanly on EOF or ctrl-c.

use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};

use sigil_core::verify::{RefreshLoop, TracingSink, VerificationSink, Verifier};
use sigil_core::{RegistryStore, SigilConfig, SnapshotCell};

/// `sigil verify`
pub async fn run(config: &SigilConfig) -> anyhow::Result<()> {
    let store = RegistryStore::new(config);
    let snapshots = SnapshotCell::empty();

    // Initial load before messages flow; an unreadable document means an
    // empty trust set until the refresh loop sees a good one.
    match store.load() {
        Ok(outcome) => {
            for entry in &outcome.skipped {
                warn!(
                    device_id = %entry.device_id,
                    reason = %entry.reason,
                    "Registry entry skipped: key material failed to decode"
                );
            }
            info!(devices = outcome.snapshot.len(), "Device registry loaded");
            snapshots.replace(outcome.snapshot);
        }
        Err(e) => {
            warn!(error = %e, "Registry unreadable, starting with an empty trust set");
        }
    }

    let refresh = RefreshLoop::new(store, snapshots.clone(), config.refresh_interval()).spawn();
    let verifier = Verifier::new(snapshots);
    let sink = TracingSink;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let result = verifier.verify_wire(line.as_bytes());
                        sink.report(&result);
                    }
                    None => {
                        info!("Input closed, shutting down");
                        break;
                    }
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    refresh.shutdown().await;
    Ok(())
}
