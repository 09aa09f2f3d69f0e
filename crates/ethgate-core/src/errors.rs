use thiserror::Error;

/// Request-path error taxonomy surfaced to the HTTP layer.
///
/// Every inbound call ends in either a response body or exactly one of
/// these reasons. All variants are request-local and final — the core
/// never retries on behalf of the caller. Mapping to HTTP statuses and
/// JSON-RPC error codes is the listener's responsibility.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Malformed JSON-RPC body, malformed hex/RLP in a raw transaction,
    /// or an unexpected parameter shape met during classification.
    #[error("decode error")]
    Decode,

    /// Batch (array) request bodies are categorically unsupported and are
    /// rejected before any further decoding.
    #[error("batch requests not supported")]
    BatchUnsupported,

    /// Method not present in the active allow-list.
    #[error("not allowed method")]
    DeniedMethod,

    /// Recipient/contract not in the active allow-list, or an
    /// unrecognized method path under enforcement.
    #[error("not allowed contract or address")]
    DeniedContract,

    /// The race strategy's global deadline elapsed with no definitive
    /// outcome.
    #[error("timeout error")]
    Timeout,

    /// The race strategy saw every upstream transport-fail.
    #[error("all upstream requests are failed")]
    AllUpstreamsFailed,

    /// The fallback strategy found every upstream marked unhealthy.
    /// Recovery happens asynchronously via timers, not via caller retry.
    #[error("no valid upstream")]
    NoHealthyUpstream,

    /// Transport failure from a single-upstream dispatch path.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Definitive transport failure while calling one upstream.
///
/// A transport-successful HTTP exchange that carries a JSON-RPC-level
/// error is *not* an `UpstreamError` — the body is still a response and
/// is classified by the strategies via [`crate::types::probe_for_error`].
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx HTTP status.
    #[error("upstream returned http status {0}")]
    HttpStatus(u16),

    /// Network-level failure from the underlying HTTP client.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Configuration load/build failures.
///
/// Fatal at first load (the process cannot start usefully); on hot
/// reloads the controller logs a warning and keeps the previous running
/// configuration instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config source: {0}")]
    Source(#[from] std::io::Error),

    #[error("failed to parse config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("need upstreams")]
    NoUpstreams,

    #[error("invalid upstream url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("blank or unsupported strategy: {0:?}")]
    UnknownStrategy(String),

    #[error("{strategy} strategy requires {requirement} (got {actual} upstreams)")]
    UpstreamCount {
        strategy: &'static str,
        requirement: &'static str,
        actual: usize,
    },
}
