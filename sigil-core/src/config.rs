//! # Sigil Configuration
//!
//! Layered configuration for registry paths, key directories, and the
//! refresh cadence:
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (`config.toml`)
//! 3. Environment variables (`SIGIL_*`, highest priority)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SigilError};

/// Default registry refresh interval in seconds
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Sigil runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SigilConfig {
    /// Backing registry document (JSON, device id → public key PEM)
    pub registry_path: PathBuf,

    /// Device-local directory for private key PEM files
    pub private_key_dir: PathBuf,

    /// Operator-local directory for public key PEM files
    pub public_key_dir: PathBuf,

    /// Seconds between full registry reloads on the verifier
    pub refresh_interval_secs: u64,

    /// Topic prefix used by the demo emitter (`<prefix>/<device_id>/data`).
    /// Topic routing itself belongs to the external bus.
    pub topic_prefix: String,
}

impl Default for SigilConfig {
    fn default() -> Self {
        let data_dir = Self::data_dir();
        Self {
            registry_path: data_dir.join("registry.json"),
            private_key_dir: data_dir.join("keys").join("private"),
            public_key_dir: data_dir.join("keys").join("public"),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            topic_prefix: "iot".to_string(),
        }
    }
}

impl SigilConfig {
    /// Load configuration from the given file (or the default location),
    /// then apply `SIGIL_*` environment overrides.
    ///
    /// A missing file is not an error, defaults apply. An unparseable
    /// file is surfaced as [`SigilError::Configuration`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        let mut config = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            toml::from_str(&data).map_err(|e| {
                SigilError::configuration(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Refresh interval as a [`Duration`]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Sigil data root directory.
    ///
    /// Environment variable `SIGIL_DATA_DIR` overrides the platform default.
    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("SIGIL_DATA_DIR") {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .map(|p| p.join("sigil"))
            .unwrap_or_else(|| PathBuf::from(".sigil"))
    }

    /// Default configuration file location
    pub fn default_config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SIGIL_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .map(|p| p.join("sigil"))
            .unwrap_or_else(|| PathBuf::from(".sigil"))
            .join("config.toml")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SIGIL_REGISTRY_PATH") {
            self.registry_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("SIGIL_PRIVATE_KEY_DIR") {
            self.private_key_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("SIGIL_PUBLIC_KEY_DIR") {
            self.public_key_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = std::env::var("SIGIL_REFRESH_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                self.refresh_interval_secs = secs;
            }
        }
        if let Ok(prefix) = std::env::var("SIGIL_TOPIC_PREFIX") {
            self.topic_prefix = prefix;
        }
    }
}
