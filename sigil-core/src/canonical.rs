//! # Canonical Byte Form
//!
//! The single serialization rule shared by signing client and verifier.
//! The signer signs exactly these bytes; the verifier recomputes them from
//! the decoded payload and must obtain a byte-identical result, or every
//! legitimate message would be rejected.
//!
//! The rule: compact JSON with object keys in lexicographic order, no
//! extraneous whitespace, UTF-8 strings left unescaped, and
//! shortest-round-trip float formatting. `serde_json::Value` gives all of
//! this for free: its object type is a sorted map and re-serializing a
//! parsed value is a fixpoint. The `preserve_order` feature of serde_json
//! must never be enabled in this workspace: it would replace the sorted map
//! with insertion order and silently break the contract.

use serde_json::Value;

use crate::error::Result;

/// Compute the canonical byte serialization of a payload value.
///
/// Payloads are canonicalized through [`serde_json::Value`], never by
/// serializing domain structs directly: struct serialization follows field
/// declaration order, which the verifier cannot reconstruct.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Canonical serialization as a string, for embedding in wire messages.
pub fn canonical_string(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
