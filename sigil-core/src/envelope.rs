//! # Transport Envelope & Signing Client
//!
//! The signed unit placed on the bus:
//! `{"payload": {...}, "signature": "<hex>"}`. The payload must carry a
//! string `device_id`; the signature covers the payload's canonical byte
//! form (see [`crate::canonical`]).

use p256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::canonical::canonical_bytes;
use crate::crypto;
use crate::error::Result;

/// The transport envelope: telemetry payload plus hex-encoded signature
/// over the payload's canonical bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Application payload; must contain `device_id`
    pub payload: Value,
    /// Hex-encoded fixed-width ECDSA signature
    pub signature: String,
}

impl Envelope {
    /// The claimed device id, if the payload carries one
    pub fn device_id(&self) -> Option<&str> {
        self.payload.get("device_id")?.as_str()
    }

    /// Serialize for transport
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a wire message. For classification of untrusted input use
    /// [`crate::verify::Verifier::verify_wire`], which maps decode
    /// failures to `MalformedEnvelope` instead of an error.
    pub fn from_wire(bytes: &[u8]) -> Result<Envelope> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Sign a caller-built payload (which must already carry `device_id`).
///
/// The exact bytes signed are the payload's canonical serialization; the
/// verifier recomputes them from the decoded payload.
pub fn sign_payload(payload: &Value, key: &SigningKey) -> Result<Envelope> {
    let bytes = canonical_bytes(payload)?;
    let signature = crypto::sign_bytes(key, &bytes);
    Ok(Envelope {
        payload: payload.clone(),
        signature: crypto::signature_to_hex(&signature),
    })
}

/// Build and sign a telemetry envelope for a device.
///
/// Payload shape: `{device_id, timestamp, data}` with `timestamp` in unix
/// seconds and `data` the caller-supplied readings object.
pub fn build_envelope(device_id: &str, readings: Value, key: &SigningKey) -> Result<Envelope> {
    let payload = json!({
        "device_id": device_id,
        "timestamp": chrono::Utc::now().timestamp(),
        "data": readings,
    });
    sign_payload(&payload, key)
}
