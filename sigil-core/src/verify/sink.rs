//! Verification outcome sink: one structured event per processed envelope.
//!
//! The concrete transport for outcomes (metric pipeline, alert queue) is an
//! external collaborator; [`TracingSink`] is the in-process default.

use tracing::{info, warn};

use crate::verify::VerificationResult;

/// Consumer of verification outcomes.
///
/// Implementations must be cheap and non-blocking; the sink runs on the
/// verification path.
pub trait VerificationSink: Send + Sync {
    /// Report one classified envelope
    fn report(&self, result: &VerificationResult);
}

/// Sink that emits one tracing event per envelope: `info` for valid
/// messages, `warn` for every rejection class.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl VerificationSink for TracingSink {
    fn report(&self, result: &VerificationResult) {
        match result {
            VerificationResult::Valid { device_id, .. } => {
                info!(
                    classification = result.classification(),
                    device_id = %device_id,
                    "Valid signature"
                );
            }
            VerificationResult::InvalidSignature { device_id, .. } => {
                warn!(
                    classification = result.classification(),
                    device_id = %device_id,
                    "Invalid signature"
                );
            }
            VerificationResult::UnknownDevice { device_id } => {
                warn!(
                    classification = result.classification(),
                    device_id = %device_id,
                    "Unregistered device"
                );
            }
            VerificationResult::MalformedEnvelope { reason } => {
                warn!(
                    classification = result.classification(),
                    reason = %reason,
                    "Malformed envelope"
                );
            }
        }
    }
}
