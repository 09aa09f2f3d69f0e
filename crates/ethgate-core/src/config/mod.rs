//! Declarative configuration, the derived running configuration and the
//! polling controller that hot-swaps it.

mod controller;
mod running;

pub use controller::{ConfigController, ConfigSource, FileSource};
pub use running::{ConfigHandle, RunningConfig};

use serde::Deserialize;

/// The declarative config document, read-only once parsed.
///
/// Field names follow the JSON document's camelCase convention. The
/// upstream list's order is significant: it defines both race order and
/// the fallback strategy's round-robin order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub upstreams: Vec<String>,

    /// Optional override endpoint for `eth_sendRawTransaction` traffic.
    #[serde(default)]
    pub send_raw_transaction_url: Option<String>,

    /// Optional override endpoint for archive/historical-state queries.
    #[serde(default)]
    pub old_trie_url: Option<String>,

    /// One of `NAIVE`, `RACE`, `FALLBACK`. Validated at build time so a
    /// typo is a build error, not a silent default.
    #[serde(default)]
    pub strategy: String,

    #[serde(default)]
    pub method_limitation_enabled: bool,

    #[serde(default)]
    pub allowed_methods: Vec<String>,

    #[serde(default)]
    pub contract_limitation_enabled: bool,

    #[serde(default)]
    pub allowed_contracts: Vec<String>,
}
