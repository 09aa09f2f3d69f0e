//! Inbound request decoding, allow-list validation and classification.
//!
//! Everything here runs on attacker-controlled input, so every decoding
//! step is an explicit `Result` — a malformed parameter shape becomes
//! [`GatewayError::Decode`], never a panic on the request path.

pub mod rlp;

use bytes::Bytes;
use serde_json::Value;

use crate::config::RunningConfig;
use crate::errors::GatewayError;
use crate::types::{is_batch, JsonRpcCall};

/// A request whose target block is more than this many blocks behind the
/// chain head may need a node retaining historical state.
const ARCHIVE_DISTANCE: u64 = 100;

/// A validated inbound JSON-RPC call.
///
/// Immutable after decoding except for the archive flag, which is set
/// once by [`Request::classify_archive`]. The original body bytes are
/// kept so upstreams receive the request verbatim.
#[derive(Debug, Clone)]
pub struct Request {
    call: JsonRpcCall,
    raw: Bytes,
    is_archive_data_request: bool,
}

impl Request {
    /// Decodes and validates a raw request body against the active
    /// running configuration.
    ///
    /// Batch (array) bodies are rejected before JSON parsing. Validation
    /// failures are final — they never reach a strategy.
    pub fn decode(raw: Bytes, config: &RunningConfig) -> Result<Self, GatewayError> {
        if is_batch(&raw) {
            return Err(GatewayError::BatchUnsupported);
        }

        let call: JsonRpcCall =
            serde_json::from_slice(&raw).map_err(|_| GatewayError::Decode)?;
        tracing::debug!(method = %call.method, "decoded request");

        validate_call(&call, config)?;

        Ok(Self {
            call,
            raw,
            is_archive_data_request: false,
        })
    }

    pub(crate) fn from_parts(call: JsonRpcCall, raw: Bytes) -> Self {
        Self {
            call,
            raw,
            is_archive_data_request: false,
        }
    }

    /// Test constructor that skips allow-list validation.
    #[cfg(test)]
    pub(crate) fn unvalidated(raw: &[u8]) -> Self {
        let call = serde_json::from_slice(raw).expect("test body must be valid JSON");
        Self::from_parts(call, Bytes::copy_from_slice(raw))
    }

    pub fn method(&self) -> &str {
        &self.call.method
    }

    pub fn id(&self) -> &Value {
        &self.call.id
    }

    pub fn params(&self) -> &[Value] {
        &self.call.params
    }

    /// The original body bytes, forwarded to upstreams unmodified.
    pub fn raw_body(&self) -> Bytes {
        self.raw.clone()
    }

    pub fn is_send_raw_transaction(&self) -> bool {
        self.call.method == "eth_sendRawTransaction"
    }

    pub fn is_archive_data_request(&self) -> bool {
        self.is_archive_data_request
    }

    /// Classifies whether this request targets possibly-archived state,
    /// stores the verdict and returns it.
    ///
    /// True only for `eth_call`/`eth_getBalance` with exactly two
    /// parameters whose block reference is strictly numeric and more
    /// than [`ARCHIVE_DISTANCE`] blocks behind `head`. An unknown head
    /// (0) always classifies as fresh.
    pub fn classify_archive(&mut self, head: u64) -> bool {
        let verdict = self.compute_archive(head);
        self.is_archive_data_request = verdict;
        verdict
    }

    fn compute_archive(&self, head: u64) -> bool {
        if head == 0 {
            return false;
        }
        if self.call.method != "eth_call" && self.call.method != "eth_getBalance" {
            return false;
        }
        if self.call.params.len() != 2 {
            return false;
        }

        match &self.call.params[1] {
            Value::String(s) => {
                if s == "latest" || s == "pending" {
                    return false;
                }
                // An unparseable reference behaves as block 0.
                let number = parse_block_number(s).unwrap_or(0);
                head.saturating_sub(number) > ARCHIVE_DISTANCE
            }
            // JSON numeric decoding is ambiguous between integer and
            // float representations; treat both uniformly.
            Value::Number(n) => {
                let number = n
                    .as_u64()
                    .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
                    .unwrap_or(0);
                head.saturating_sub(number) > ARCHIVE_DISTANCE
            }
            other => {
                tracing::warn!(block_reference = %other, "unrecognized block reference shape");
                false
            }
        }
    }
}

/// Parses a numeric block reference: `0x`-prefixed hex or decimal.
fn parse_block_number(s: &str) -> Option<u64> {
    if let Some(hex_digits) = s.strip_prefix("0x") {
        u64::from_str_radix(hex_digits, 16).ok()
    } else {
        s.parse::<u64>().ok()
    }
}

/// Method/contract allow-list enforcement.
///
/// When method limitation is disabled this is a no-op. Otherwise the
/// method must be allow-listed, and the method-specific rules of the
/// call-shaped and raw-transaction methods apply on top.
fn validate_call(call: &JsonRpcCall, config: &RunningConfig) -> Result<(), GatewayError> {
    if !config.method_limitation_enabled() {
        return Ok(());
    }

    if !config.is_allowed_method(&call.method) {
        return Err(GatewayError::DeniedMethod);
    }

    match call.method.as_str() {
        "eth_getBalance" | "eth_getTransactionReceipt" => Ok(()),

        "eth_call" | "eth_estimateGas" => {
            let to = call
                .params
                .first()
                .and_then(Value::as_object)
                .and_then(|object| object.get("to"))
                .and_then(Value::as_str)
                .ok_or(GatewayError::Decode)?;
            if config.is_allowed_contract(to) {
                Ok(())
            } else {
                Err(GatewayError::DeniedContract)
            }
        }

        "eth_sendRawTransaction" => {
            let payload = call
                .params
                .first()
                .and_then(Value::as_str)
                .ok_or(GatewayError::Decode)?;
            let recipient = rlp::recipient_from_raw_transaction(payload)?;
            if config.is_allowed_contract(&recipient) {
                Ok(())
            } else {
                Err(GatewayError::DeniedContract)
            }
        }

        // Defensive tail kept from the original gateway: re-check the
        // allow-list and deny anything that falls through.
        method if config.is_allowed_method(method) => Ok(()),
        _ => Err(GatewayError::DeniedContract),
    }
}

#[cfg(test)]
mod tests {
    use super::rlp::tests::legacy_tx_hex;
    use super::*;
    use crate::config::{GatewayConfig, RunningConfig};
    use crate::upstream::HttpClient;

    const ALLOWED: &str = "0xDEADBEEF00112233445566778899AABBCCDDEEFF";

    fn config(method_limitation: bool, contract_limitation: bool) -> RunningConfig {
        let config = GatewayConfig {
            upstreams: vec!["http://localhost:8545".to_string()],
            send_raw_transaction_url: None,
            old_trie_url: None,
            strategy: "NAIVE".to_string(),
            method_limitation_enabled: method_limitation,
            allowed_methods: [
                "eth_call",
                "eth_estimateGas",
                "eth_getBalance",
                "eth_getTransactionReceipt",
                "eth_sendRawTransaction",
                "eth_blockNumber",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            contract_limitation_enabled: contract_limitation,
            allowed_contracts: vec![ALLOWED.to_string()],
        };
        RunningConfig::build(&config, &HttpClient::new().unwrap()).unwrap()
    }

    fn decode(body: &str, config: &RunningConfig) -> Result<Request, GatewayError> {
        Request::decode(Bytes::copy_from_slice(body.as_bytes()), config)
    }

    #[test]
    fn batch_bodies_are_rejected_before_parsing() {
        let body = r#"[{"id":1,"method":"eth_blockNumber","params":[]}]"#;
        assert!(matches!(
            decode(body, &config(false, false)),
            Err(GatewayError::BatchUnsupported)
        ));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(
            decode("{not json", &config(false, false)),
            Err(GatewayError::Decode)
        ));
    }

    #[test]
    fn disabled_method_limitation_allows_anything() {
        let body = r#"{"id":1,"method":"made_up_method","params":[]}"#;
        assert!(decode(body, &config(false, true)).is_ok());
    }

    #[test]
    fn unlisted_method_is_denied() {
        let body = r#"{"id":1,"method":"eth_getLogs","params":[]}"#;
        assert!(matches!(
            decode(body, &config(true, false)),
            Err(GatewayError::DeniedMethod)
        ));
    }

    #[test]
    fn allowed_method_without_specific_rule_passes() {
        let body = r#"{"id":1,"method":"eth_blockNumber","params":[]}"#;
        assert!(decode(body, &config(true, true)).is_ok());
    }

    #[test]
    fn eth_call_checks_the_target_contract() {
        let allowed = format!(
            r#"{{"id":1,"method":"eth_call","params":[{{"to":"{}"}},"latest"]}}"#,
            ALLOWED.to_lowercase()
        );
        assert!(decode(&allowed, &config(true, true)).is_ok());

        let denied = r#"{"id":1,"method":"eth_call","params":[{"to":"0x0000000000000000000000000000000000000001"},"latest"]}"#;
        assert!(matches!(
            decode(denied, &config(true, true)),
            Err(GatewayError::DeniedContract)
        ));
    }

    #[test]
    fn contract_matching_is_case_insensitive() {
        let body = format!(
            r#"{{"id":1,"method":"eth_estimateGas","params":[{{"to":"{}"}}]}}"#,
            ALLOWED.to_uppercase().replace("0X", "0x")
        );
        assert!(decode(&body, &config(true, true)).is_ok());
    }

    #[test]
    fn missing_call_object_is_a_decode_error_not_a_panic() {
        for params in [r#"[]"#, r#"[42]"#, r#"[{"from":"0xabc"}]"#, r#"[{"to":7}]"#] {
            let body = format!(r#"{{"id":1,"method":"eth_call","params":{params}}}"#);
            assert!(
                matches!(decode(&body, &config(true, true)), Err(GatewayError::Decode)),
                "params {params} should fail decoding"
            );
        }
    }

    #[test]
    fn disabled_contract_limitation_allows_any_target() {
        let body = r#"{"id":1,"method":"eth_call","params":[{"to":"0x0000000000000000000000000000000000000001"},"latest"]}"#;
        assert!(decode(body, &config(true, false)).is_ok());
    }

    #[test]
    fn raw_transaction_recipient_encodings_get_identical_outcomes() {
        let address_bytes = hex::decode(&ALLOWED[2..]).unwrap();
        let as_bytes = legacy_tx_hex(address_bytes);
        let as_string = legacy_tx_hex(ALLOWED.to_lowercase().into_bytes());

        for tx in [as_bytes, as_string] {
            let body =
                format!(r#"{{"id":1,"method":"eth_sendRawTransaction","params":["{tx}"]}}"#);
            assert!(decode(&body, &config(true, true)).is_ok(), "tx {tx} should be allowed");
        }

        let stranger = legacy_tx_hex(vec![0x01; 20]);
        let body =
            format!(r#"{{"id":1,"method":"eth_sendRawTransaction","params":["{stranger}"]}}"#);
        assert!(matches!(
            decode(&body, &config(true, true)),
            Err(GatewayError::DeniedContract)
        ));
    }

    #[test]
    fn raw_transaction_with_bad_payload_is_a_decode_error() {
        for payload in ["0xzz", "0x00"] {
            let body =
                format!(r#"{{"id":1,"method":"eth_sendRawTransaction","params":["{payload}"]}}"#);
            assert!(matches!(
                decode(&body, &config(true, true)),
                Err(GatewayError::Decode)
            ));
        }
    }

    #[test]
    fn archive_classification_follows_distance() {
        let mut request =
            Request::unvalidated(br#"{"id":1,"method":"eth_getBalance","params":["0xabc","latest"]}"#);
        assert!(!request.classify_archive(1_000_000));

        let mut request =
            Request::unvalidated(br#"{"id":1,"method":"eth_call","params":[{},800]}"#);
        assert!(request.classify_archive(1000));

        let mut request =
            Request::unvalidated(br#"{"id":1,"method":"eth_call","params":[{},950]}"#);
        assert!(!request.classify_archive(1000));
    }

    #[test]
    fn archive_classification_handles_numeric_shapes_uniformly() {
        for reference in [r#""800""#, r#""0x320""#, "800", "800.0"] {
            let body = format!(r#"{{"id":1,"method":"eth_getBalance","params":["0xabc",{reference}]}}"#);
            let mut request = Request::unvalidated(body.as_bytes());
            assert!(request.classify_archive(1000), "reference {reference} should be archive");
        }
    }

    #[test]
    fn unknown_head_never_classifies_archive() {
        let mut request =
            Request::unvalidated(br#"{"id":1,"method":"eth_call","params":[{},1]}"#);
        assert!(!request.classify_archive(0));
    }

    #[test]
    fn wrong_method_or_arity_never_classifies_archive() {
        let mut request =
            Request::unvalidated(br#"{"id":1,"method":"eth_getCode","params":["0xabc",1]}"#);
        assert!(!request.classify_archive(1000));

        let mut request = Request::unvalidated(br#"{"id":1,"method":"eth_call","params":[{}]}"#);
        assert!(!request.classify_archive(1000));
    }
}
