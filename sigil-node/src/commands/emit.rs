//! Device-side envelope emission.
//!
//! Loads the device's private key, builds signed telemetry envelopes and
//! prints one wire-encoded envelope per line to stdout. Carrying the lines
//! onto the bus (publish to `<prefix>/<device_id>/data`) is the external
//! transport's job; piping into `sigil verify` exercises the full path
//! locally.

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use serde_json::{json, Value};
use tracing::info;

use sigil_core::{build_envelope, RegistryStore, SigilConfig};

/// `sigil emit <device-id>`
pub async fn run(
    config: &SigilConfig,
    device_id: &str,
    data: Option<&str>,
    count: Option<u64>,
    interval_secs: u64,
) -> anyhow::Result<()> {
    let store = RegistryStore::new(config);
    let signing_key = store.load_private_key(device_id).with_context(|| {
        format!(
            "Failed to load private key for '{}' from {}",
            device_id,
            store.private_key_path(device_id).display()
        )
    })?;

    let readings: Option<Value> = match data {
        Some(raw) => Some(serde_json::from_str(raw).context("--data is not valid JSON")?),
        None => None,
    };

    let topic = format!("{}/{}/data", config.topic_prefix, device_id);
    info!(device_id, topic = %topic, "Emitter started");

    // interval() panics on a zero period
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    let mut sequence: u64 = 0;
    loop {
        ticker.tick().await;

        let data = readings
            .clone()
            .unwrap_or_else(|| json!({"seq": sequence}));
        let envelope = build_envelope(device_id, data, &signing_key)?;

        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer(&mut stdout, &envelope)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;

        sequence += 1;
        if let Some(count) = count {
            if sequence >= count {
                break;
            }
        }
    }

    info!(device_id, sent = sequence, "Emitter finished");
    Ok(())
}
