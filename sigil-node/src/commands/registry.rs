//! Operator-facing registration and inspection commands.
//!
//! Registration is out-of-band by design: the device's key pair is
//! generated here, the private half written to the device-local key
//! directory for transfer onto the device, the public half persisted in
//! the registry document the verifier reloads.

use anyhow::Context;
use sigil_core::{RegistryStore, SigilConfig};

/// `sigil register <device-id>`
pub fn register(config: &SigilConfig, device_id: &str) -> anyhow::Result<()> {
    let store = RegistryStore::new(config);
    store
        .register(device_id)
        .with_context(|| format!("Failed to register '{}'", device_id))?;

    let device_id = device_id.trim();
    println!("✅ Device '{}' registered.", device_id);
    println!("   Private key: {}", store.private_key_path(device_id).display());
    println!("   Public key:  {}", store.public_key_path(device_id).display());
    println!("   Registry:    {}", store.registry_path().display());
    Ok(())
}

/// `sigil list`
pub fn list(config: &SigilConfig) -> anyhow::Result<()> {
    let store = RegistryStore::new(config);
    let ids = store
        .device_ids()
        .context("Failed to read the registry document")?;

    if ids.is_empty() {
        println!("No devices registered.");
    } else {
        println!("Registered devices ({}):", ids.len());
        for id in ids {
            println!("  {}", id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &tempfile::TempDir) -> SigilConfig {
        SigilConfig {
            registry_path: dir.path().join("registry.json"),
            private_key_dir: dir.path().join("private"),
            public_key_dir: dir.path().join("public"),
            ..SigilConfig::default()
        }
    }

    #[test]
    fn test_register_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);

        register(&config, "device1").unwrap();
        register(&config, "device2").unwrap();
        list(&config).unwrap();

        let store = RegistryStore::new(&config);
        assert_eq!(store.device_ids().unwrap(), vec!["device1", "device2"]);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);

        register(&config, "device1").unwrap();
        assert!(register(&config, "device1").is_err());
    }
}
