//! # Verification Pipeline
//!
//! Classifies every inbound envelope against the current trust snapshot.
//! Stateless across envelopes; each message produces exactly one
//! [`VerificationResult`], and an arbitrary, adversarial byte stream must
//! never crash the process: every decode or verify failure is data, not a
//! fault.
//!
//! Per-envelope state machine (each step terminal on failure):
//!
//! 1. **Parse** the envelope; missing fields or a non-hex signature ⇒
//!    [`VerificationResult::MalformedEnvelope`]
//! 2. **Resolve identity** from `payload.device_id`; absent ⇒ malformed
//! 3. **Lookup** in the snapshot; absent ⇒
//!    [`VerificationResult::UnknownDevice`]
//! 4. **Recompute & verify** the canonical bytes; mismatch or signature
//!    decode failure ⇒ [`VerificationResult::InvalidSignature`]

pub mod refresh;
pub mod sink;

pub use refresh::{RefreshHandle, RefreshLoop};
pub use sink::{TracingSink, VerificationSink};

use p256::ecdsa::Signature;
use serde_json::Value;

use crate::canonical::canonical_bytes;
use crate::crypto;
use crate::envelope::Envelope;
use crate::registry::SnapshotCell;

/// Terminal classification of one inbound envelope
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    /// Signature checks out against the registered key
    Valid {
        /// Authenticated device id
        device_id: String,
        /// The verified payload
        payload: Value,
    },
    /// The claimed device is known but the signature does not verify
    InvalidSignature {
        /// Claimed device id
        device_id: String,
        /// The rejected payload
        payload: Value,
    },
    /// The claimed device has no registry entry
    UnknownDevice {
        /// Claimed device id
        device_id: String,
    },
    /// The envelope could not be decoded far enough to classify further
    MalformedEnvelope {
        /// What failed to decode
        reason: String,
    },
}

impl VerificationResult {
    /// The device id, when the envelope got far enough to claim one
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Valid { device_id, .. }
            | Self::InvalidSignature { device_id, .. }
            | Self::UnknownDevice { device_id } => Some(device_id),
            Self::MalformedEnvelope { .. } => None,
        }
    }

    /// True for [`VerificationResult::Valid`]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Stable classification label for structured logging and metrics
    pub fn classification(&self) -> &'static str {
        match self {
            Self::Valid { .. } => "valid",
            Self::InvalidSignature { .. } => "invalid_signature",
            Self::UnknownDevice { .. } => "unknown_device",
            Self::MalformedEnvelope { .. } => "malformed_envelope",
        }
    }
}

/// The verification pipeline, reading trust state from a [`SnapshotCell`].
#[derive(Debug, Clone)]
pub struct Verifier {
    snapshots: SnapshotCell,
}

impl Verifier {
    /// Create a verifier over the given snapshot cell
    pub fn new(snapshots: SnapshotCell) -> Self {
        Self { snapshots }
    }

    /// Classify a raw wire message
    pub fn verify_wire(&self, raw: &[u8]) -> VerificationResult {
        let envelope: Envelope = match serde_json::from_slice(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                return VerificationResult::MalformedEnvelope {
                    reason: format!("invalid envelope: {}", e),
                }
            }
        };
        self.verify_envelope(&envelope)
    }

    /// Classify a decoded envelope
    pub fn verify_envelope(&self, envelope: &Envelope) -> VerificationResult {
        // Step 1: parse. Payload must be an object, signature must be hex
        if !envelope.payload.is_object() {
            return VerificationResult::MalformedEnvelope {
                reason: "payload is not an object".to_string(),
            };
        }
        let signature_bytes = match hex::decode(&envelope.signature) {
            Ok(bytes) => bytes,
            Err(_) => {
                return VerificationResult::MalformedEnvelope {
                    reason: "signature is not hex".to_string(),
                }
            }
        };

        // Step 2: resolve the claimed identity
        let device_id = match envelope.device_id() {
            Some(id) => id.to_string(),
            None => {
                return VerificationResult::MalformedEnvelope {
                    reason: "missing device_id".to_string(),
                }
            }
        };

        // Step 3: lookup against one consistent snapshot; a concurrent
        // refresh never preempts a partially-verified message
        let snapshot = self.snapshots.current();
        let key = match snapshot.resolve(&device_id) {
            Some(key) => key,
            None => return VerificationResult::UnknownDevice { device_id },
        };

        // Step 4: recompute canonical bytes and verify
        let payload = envelope.payload.clone();
        let bytes = match canonical_bytes(&payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                return VerificationResult::MalformedEnvelope {
                    reason: format!("payload cannot be canonicalized: {}", e),
                }
            }
        };
        let signature = match Signature::from_slice(&signature_bytes) {
            Ok(signature) => signature,
            Err(_) => {
                return VerificationResult::InvalidSignature { device_id, payload }
            }
        };

        if crypto::verify_bytes(key, &bytes, &signature) {
            VerificationResult::Valid { device_id, payload }
        } else {
            VerificationResult::InvalidSignature { device_id, payload }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_keypair;
    use crate::envelope::sign_payload;
    use crate::registry::TrustSnapshot;
    use serde_json::json;
    use std::collections::HashMap;

    fn verifier_with(device_id: &str, key: p256::ecdsa::VerifyingKey) -> Verifier {
        let mut keys = HashMap::new();
        keys.insert(device_id.to_string(), key);
        Verifier::new(SnapshotCell::new(TrustSnapshot::from_keys(keys)))
    }

    #[test]
    fn test_valid_envelope() {
        let pair = generate_keypair();
        let verifier = verifier_with("device1", pair.verifying_key);

        let payload = json!({"device_id": "device1", "t": 1});
        let envelope = sign_payload(&payload, &pair.signing_key).unwrap();

        let result = verifier.verify_wire(&envelope.to_wire().unwrap());
        assert_eq!(
            result,
            VerificationResult::Valid {
                device_id: "device1".to_string(),
                payload
            }
        );
        assert!(result.is_valid());
        assert_eq!(result.classification(), "valid");
    }

    #[test]
    fn test_malformed_json() {
        let pair = generate_keypair();
        let verifier = verifier_with("device1", pair.verifying_key);
        let result = verifier.verify_wire(b"{truncated");
        assert!(matches!(
            result,
            VerificationResult::MalformedEnvelope { .. }
        ));
        assert_eq!(result.device_id(), None);
    }

    #[test]
    fn test_missing_signature_field() {
        let pair = generate_keypair();
        let verifier = verifier_with("device1", pair.verifying_key);
        let result = verifier.verify_wire(br#"{"payload": {"device_id": "device1"}}"#);
        assert!(matches!(
            result,
            VerificationResult::MalformedEnvelope { .. }
        ));
    }

    #[test]
    fn test_non_hex_signature() {
        let pair = generate_keypair();
        let verifier = verifier_with("device1", pair.verifying_key);
        let result =
            verifier.verify_wire(br#"{"payload": {"device_id": "device1"}, "signature": "zz"}"#);
        assert_eq!(
            result,
            VerificationResult::MalformedEnvelope {
                reason: "signature is not hex".to_string()
            }
        );
    }

    #[test]
    fn test_missing_device_id() {
        let pair = generate_keypair();
        let verifier = verifier_with("device1", pair.verifying_key);
        let result = verifier.verify_wire(br#"{"payload": {"t": 1}, "signature": "00ff"}"#);
        assert_eq!(
            result,
            VerificationResult::MalformedEnvelope {
                reason: "missing device_id".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_device() {
        let pair = generate_keypair();
        let ghost = generate_keypair();
        let verifier = verifier_with("device1", pair.verifying_key);

        // Even a well-signed envelope is rejected when the id is unknown
        let payload = json!({"device_id": "ghost", "t": 1});
        let envelope = sign_payload(&payload, &ghost.signing_key).unwrap();
        assert_eq!(
            verifier.verify_envelope(&envelope),
            VerificationResult::UnknownDevice {
                device_id: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_signature_from_wrong_device() {
        let pair = generate_keypair();
        let impostor = generate_keypair();
        let verifier = verifier_with("device1", pair.verifying_key);

        let payload = json!({"device_id": "device1", "t": 1});
        let envelope = sign_payload(&payload, &impostor.signing_key).unwrap();
        assert!(matches!(
            verifier.verify_envelope(&envelope),
            VerificationResult::InvalidSignature { .. }
        ));
    }

    #[test]
    fn test_truncated_signature_is_invalid() {
        let pair = generate_keypair();
        let verifier = verifier_with("device1", pair.verifying_key);

        let payload = json!({"device_id": "device1", "t": 1});
        let mut envelope = sign_payload(&payload, &pair.signing_key).unwrap();
        envelope.signature.truncate(16);
        assert!(matches!(
            verifier.verify_envelope(&envelope),
            VerificationResult::InvalidSignature { .. }
        ));
    }

    #[test]
    fn test_tampered_payload_field() {
        let pair = generate_keypair();
        let verifier = verifier_with("device1", pair.verifying_key);

        let payload = json!({"device_id": "device1", "t": 1});
        let mut envelope = sign_payload(&payload, &pair.signing_key).unwrap();
        envelope.payload["t"] = json!(2);
        assert!(matches!(
            verifier.verify_envelope(&envelope),
            VerificationResult::InvalidSignature { .. }
        ));
    }
}
