//! # Sigil Error Types
//!
//! Centralized error handling for the Sigil core library.
//!
//! Verification outcomes (`MalformedEnvelope`, `UnknownDevice`,
//! `InvalidSignature`) are deliberately NOT errors: they are expected,
//! frequent classifications carried by
//! [`crate::verify::VerificationResult`]. Nothing in the verification path
//! returns a `SigilError`.

use thiserror::Error;

/// Result type alias for Sigil operations
pub type Result<T> = std::result::Result<T, SigilError>;

/// Core error types for Sigil
#[derive(Error, Debug)]
pub enum SigilError {
    /// Unparseable key material (malformed PEM, unsupported curve)
    #[error("Key format error: {0}")]
    KeyFormat(String),

    /// Registration rejected: blank device id
    #[error("Device ID cannot be empty")]
    EmptyDeviceId,

    /// Registration rejected: the id already has a key pair
    #[error("Device already registered: {0}")]
    AlreadyRegistered(String),

    /// Backing registry document unreadable or unparseable
    #[error("Registry load error: {0}")]
    RegistryLoad(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SigilError {
    /// Create a new key format error
    pub fn key_format(msg: impl Into<String>) -> Self {
        Self::KeyFormat(msg.into())
    }

    /// Create a new registry load error
    pub fn registry_load(msg: impl Into<String>) -> Self {
        Self::RegistryLoad(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
