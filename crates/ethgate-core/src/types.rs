//! JSON-RPC wire types shared across the gateway.
//!
//! Inbound bodies deserialize into [`JsonRpcCall`]; upstream bodies are
//! only ever *probed*, never re-serialized — the gateway forwards
//! upstream response bytes verbatim and uses [`ResponseProbe`] solely to
//! decide whether a body carries a JSON-RPC-level error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// A decoded JSON-RPC 2.0 call.
///
/// `id` is kept as a raw [`Value`] — clients legitimately send numbers,
/// strings or null, and the gateway only echoes it back on error paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcCall {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// The slice of an upstream response body the gateway cares about.
///
/// `error: null` and an absent `error` field are both "no error", which
/// is why the field is an `Option` rather than a bare `Value`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseProbe {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Inspects a response body for a JSON-RPC-level error.
///
/// Tries a single response object first. If the body is not a single
/// object, falls back to scanning it as a *batch* response and reports
/// the first element carrying an `error` field. Batch requests are
/// rejected at the gateway's edge, but an upstream that fans out
/// internally can still answer with a batch body, so the probe keeps
/// the asymmetry.
///
/// Returns `None` for clean responses and for bodies that parse as
/// neither shape — an unclassifiable body is still a response and is
/// forwarded as-is.
#[must_use]
pub fn probe_for_error(body: &[u8]) -> Option<ResponseProbe> {
    if let Ok(probe) = serde_json::from_slice::<ResponseProbe>(body) {
        return probe.error.is_some().then_some(probe);
    }

    if let Ok(batch) = serde_json::from_slice::<Vec<ResponseProbe>>(body) {
        return batch.into_iter().find(|probe| probe.error.is_some());
    }

    None
}

/// Returns `true` if the first non-whitespace byte opens a JSON array.
///
/// Cheap batch detection that runs before any JSON parsing, so oversized
/// or malicious array bodies never reach the decoder.
#[must_use]
pub fn is_batch(body: &[u8]) -> bool {
    body.iter()
        .find(|&&b| !matches!(b, 0x20 | 0x09 | 0x0a | 0x0d))
        .is_some_and(|&b| b == b'[')
}
