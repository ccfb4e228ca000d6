//! Backing storage for the identity registry: the JSON registry document
//! plus per-device PEM key files.
//!
//! Document format: a JSON object, keys = device identifiers, values =
//! `{"public_key": "<PEM text>"}`. Written by registration, read by
//! load/refresh.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SigilConfig;
use crate::crypto::{self, KeyPair};
use crate::error::{Result, SigilError};
use crate::registry::snapshot::TrustSnapshot;

/// One registry record: the device's public key as SPKI PEM text.
///
/// Immutable once written; there is no update or delete operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryEntry {
    /// SubjectPublicKeyInfo PEM
    pub public_key: String,
}

/// An entry that failed to decode during a load, surfaced to the caller
/// instead of silently shrinking the trust set.
#[derive(Debug, Clone)]
pub struct SkippedEntry {
    /// Device id of the rejected entry
    pub device_id: String,
    /// Decode failure description
    pub reason: String,
}

/// Result of a full registry load: the usable snapshot plus every entry
/// that had to be rejected.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Fully-decoded trust snapshot
    pub snapshot: TrustSnapshot,
    /// Entries rejected because their key material failed to decode
    pub skipped: Vec<SkippedEntry>,
}

type RegistryDocument = BTreeMap<String, RegistryEntry>;

/// Durable registry store: one JSON document for public keys, one PEM file
/// per device on each side of the trust boundary (private key device-local,
/// public key operator-local).
#[derive(Debug, Clone)]
pub struct RegistryStore {
    registry_path: PathBuf,
    private_key_dir: PathBuf,
    public_key_dir: PathBuf,
}

impl RegistryStore {
    /// Create a store from configuration
    pub fn new(config: &SigilConfig) -> Self {
        Self {
            registry_path: config.registry_path.clone(),
            private_key_dir: config.private_key_dir.clone(),
            public_key_dir: config.public_key_dir.clone(),
        }
    }

    /// Create a store from explicit paths
    pub fn with_paths(
        registry_path: impl Into<PathBuf>,
        private_key_dir: impl Into<PathBuf>,
        public_key_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry_path: registry_path.into(),
            private_key_dir: private_key_dir.into(),
            public_key_dir: public_key_dir.into(),
        }
    }

    /// Path of the backing registry document
    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// Private key file for a device (device-local storage)
    pub fn private_key_path(&self, device_id: &str) -> PathBuf {
        self.private_key_dir.join(format!("{}_private.pem", device_id))
    }

    /// Public key file for a device (operator-local storage)
    pub fn public_key_path(&self, device_id: &str) -> PathBuf {
        self.public_key_dir.join(format!("{}_public.pem", device_id))
    }

    /// Register a new device.
    ///
    /// Generates a P-256 key pair, persists the public key under
    /// `device_id` in the backing document and writes both PEM files.
    /// Fails with [`SigilError::EmptyDeviceId`] on a blank id and
    /// [`SigilError::AlreadyRegistered`] if the id exists; neither failure
    /// leaves a partial write behind.
    pub fn register(&self, device_id: &str) -> Result<KeyPair> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(SigilError::EmptyDeviceId);
        }

        let mut document = self.read_document()?;
        if document.contains_key(device_id) {
            return Err(SigilError::AlreadyRegistered(device_id.to_string()));
        }

        let pair = crypto::generate_keypair();
        let private_pem = crypto::serialize_private(&pair.signing_key)?;
        let public_pem = crypto::serialize_public(&pair.verifying_key)?;

        document.insert(
            device_id.to_string(),
            RegistryEntry {
                public_key: public_pem.clone(),
            },
        );

        self.write_document(&document)?;

        fs::create_dir_all(&self.private_key_dir)?;
        fs::create_dir_all(&self.public_key_dir)?;

        let private_path = self.private_key_path(device_id);
        fs::write(&private_path, private_pem)?;
        fs::write(self.public_key_path(device_id), public_pem)?;

        // Private key readable by the owner only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&private_path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&private_path, perms)?;
        }

        info!(device_id, "Device registered");
        Ok(pair)
    }

    /// Load the full registry and build a trust snapshot.
    ///
    /// A missing document is the first-run condition and yields an empty
    /// snapshot. An unreadable or unparseable document is a
    /// [`SigilError::RegistryLoad`]; the caller decides whether to keep
    /// an earlier snapshot alive. Entries whose PEM fails to decode are
    /// skipped and reported in [`LoadOutcome::skipped`].
    pub fn load(&self) -> Result<LoadOutcome> {
        if !self.registry_path.exists() {
            debug!(path = %self.registry_path.display(), "Registry document absent, trust set empty");
            return Ok(LoadOutcome::default());
        }

        let data = fs::read_to_string(&self.registry_path).map_err(|e| {
            SigilError::registry_load(format!(
                "Failed to read {}: {}",
                self.registry_path.display(),
                e
            ))
        })?;

        // Entry-level tolerance: one record with a bad shape or bad key
        // material is skipped and surfaced; it must not take down the
        // whole load, and it must never populate the trust set.
        let document: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&data).map_err(|e| {
                SigilError::registry_load(format!(
                    "Failed to decode {}: {}",
                    self.registry_path.display(),
                    e
                ))
            })?;

        let mut keys = HashMap::with_capacity(document.len());
        let mut skipped = Vec::new();
        for (device_id, value) in document {
            let entry: RegistryEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(e) => {
                    skipped.push(SkippedEntry {
                        device_id,
                        reason: format!("invalid entry: {}", e),
                    });
                    continue;
                }
            };
            match crypto::deserialize_public(&entry.public_key) {
                Ok(key) => {
                    keys.insert(device_id, key);
                }
                Err(e) => skipped.push(SkippedEntry {
                    device_id,
                    reason: e.to_string(),
                }),
            }
        }

        debug!(
            devices = keys.len(),
            skipped = skipped.len(),
            "Registry document loaded"
        );

        Ok(LoadOutcome {
            snapshot: TrustSnapshot::from_keys(keys),
            skipped,
        })
    }

    /// Sorted device ids present in the backing document
    pub fn device_ids(&self) -> Result<Vec<String>> {
        Ok(self.read_document()?.into_keys().collect())
    }

    /// Load a device's private key from its PEM file
    pub fn load_private_key(&self, device_id: &str) -> Result<p256::ecdsa::SigningKey> {
        let path = self.private_key_path(device_id);
        let pem = fs::read_to_string(&path)?;
        crypto::deserialize_private(&pem)
    }

    /// Read the backing document; absent means empty, unparseable is an
    /// error (registration must not clobber a document it cannot read).
    fn read_document(&self) -> Result<RegistryDocument> {
        if !self.registry_path.exists() {
            return Ok(RegistryDocument::new());
        }
        let data = fs::read_to_string(&self.registry_path)?;
        serde_json::from_str(&data).map_err(|e| {
            SigilError::registry_load(format!(
                "Failed to decode {}: {}",
                self.registry_path.display(),
                e
            ))
        })
    }

    fn write_document(&self, document: &RegistryDocument) -> Result<()> {
        if let Some(parent) = self.registry_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(document)?;
        fs::write(&self.registry_path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, RegistryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::with_paths(
            dir.path().join("registry.json"),
            dir.path().join("private"),
            dir.path().join("public"),
        );
        (dir, store)
    }

    #[test]
    fn test_register_persists_document_and_key_files() {
        let (_dir, store) = test_store();
        let pair = store.register("device1").unwrap();

        assert!(store.registry_path().exists());
        assert!(store.private_key_path("device1").exists());
        assert!(store.public_key_path("device1").exists());

        let outcome = store.load().unwrap();
        assert_eq!(outcome.snapshot.len(), 1);
        assert!(outcome.skipped.is_empty());

        // The registered key verifies what the device signs
        let resolved = outcome.snapshot.resolve("device1").unwrap();
        let signature = crypto::sign_bytes(&pair.signing_key, b"probe");
        assert!(crypto::verify_bytes(resolved, b"probe", &signature));

        // And the persisted private key is the same key
        let reloaded = store.load_private_key("device1").unwrap();
        let signature = crypto::sign_bytes(&reloaded, b"probe");
        assert!(crypto::verify_bytes(resolved, b"probe", &signature));
    }

    #[test]
    fn test_register_empty_id_rejected() {
        let (_dir, store) = test_store();
        assert!(matches!(
            store.register("   "),
            Err(SigilError::EmptyDeviceId)
        ));
        assert!(!store.registry_path().exists());
    }

    #[test]
    fn test_register_twice_rejected_and_first_key_unchanged() {
        let (_dir, store) = test_store();
        store.register("device1").unwrap();
        let first_pem = fs::read_to_string(store.public_key_path("device1")).unwrap();

        assert!(matches!(
            store.register("device1"),
            Err(SigilError::AlreadyRegistered(id)) if id == "device1"
        ));

        let second_pem = fs::read_to_string(store.public_key_path("device1")).unwrap();
        assert_eq!(first_pem, second_pem);
    }

    #[test]
    fn test_register_trims_device_id() {
        let (_dir, store) = test_store();
        store.register("  device1  ").unwrap();
        assert_eq!(store.device_ids().unwrap(), vec!["device1"]);
    }

    #[test]
    fn test_load_missing_document_is_empty() {
        let (_dir, store) = test_store();
        let outcome = store.load().unwrap();
        assert!(outcome.snapshot.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_load_corrupt_document_is_an_error() {
        let (_dir, store) = test_store();
        fs::create_dir_all(store.registry_path().parent().unwrap()).unwrap();
        fs::write(store.registry_path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(SigilError::RegistryLoad(_))));
    }

    #[test]
    fn test_load_skips_and_surfaces_undecodable_entries() {
        let (_dir, store) = test_store();
        store.register("good").unwrap();

        // Hand-corrupt one entry's PEM
        let mut document: RegistryDocument =
            serde_json::from_str(&fs::read_to_string(store.registry_path()).unwrap()).unwrap();
        document.insert(
            "bad".to_string(),
            RegistryEntry {
                public_key: "-----BEGIN PUBLIC KEY-----\nnot a key\n-----END PUBLIC KEY-----\n"
                    .to_string(),
            },
        );
        fs::write(
            store.registry_path(),
            serde_json::to_string_pretty(&document).unwrap(),
        )
        .unwrap();

        let outcome = store.load().unwrap();
        assert_eq!(outcome.snapshot.len(), 1);
        assert!(outcome.snapshot.resolve("good").is_some());
        assert!(outcome.snapshot.resolve("bad").is_none());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].device_id, "bad");
    }

    #[test]
    fn test_load_skips_entries_with_bad_shape() {
        let (_dir, store) = test_store();
        store.register("good").unwrap();

        let mut document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.registry_path()).unwrap()).unwrap();
        document["weird"] = serde_json::json!(42);
        fs::write(store.registry_path(), document.to_string()).unwrap();

        let outcome = store.load().unwrap();
        assert_eq!(outcome.snapshot.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].device_id, "weird");
    }

    #[test]
    fn test_register_on_corrupt_document_fails_without_clobbering() {
        let (_dir, store) = test_store();
        fs::create_dir_all(store.registry_path().parent().unwrap()).unwrap();
        fs::write(store.registry_path(), "{not json").unwrap();

        assert!(matches!(
            store.register("device1"),
            Err(SigilError::RegistryLoad(_))
        ));
        // Document untouched
        assert_eq!(
            fs::read_to_string(store.registry_path()).unwrap(),
            "{not json"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_private_key_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, store) = test_store();
        store.register("device1").unwrap();
        let mode = fs::metadata(store.private_key_path("device1"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
