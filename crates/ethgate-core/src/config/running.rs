use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use url::Url;

use crate::errors::ConfigError;
use crate::strategy::{FallbackProxy, NaiveProxy, RaceProxy, Strategy, Upstreams};
use crate::upstream::{HttpClient, HttpUpstream, UpstreamHandle};

use super::GatewayConfig;

/// The immutable, derived configuration a request is served under.
///
/// Built whole from a [`GatewayConfig`]; never mutated in place. Exactly
/// one instance is current at a time (see [`ConfigHandle`]) and readers
/// hold their snapshot for the duration of one request without locking.
pub struct RunningConfig {
    upstreams: Upstreams,
    strategy: Arc<dyn Strategy>,
    method_limitation_enabled: bool,
    contract_limitation_enabled: bool,
    allowed_methods: HashSet<String>,
    /// Lower-cased at build time; lookups lower-case the probe, which
    /// makes the contract check case-insensitive end to end.
    allowed_contracts: HashSet<String>,
}

impl RunningConfig {
    /// Builds a running configuration, validating the strategy/upstream
    /// pairing.
    ///
    /// # Errors
    ///
    /// - no upstreams configured;
    /// - an upstream (or override) URL fails to parse;
    /// - a blank or unknown strategy name;
    /// - `NAIVE` with more than one upstream, or `RACE`/`FALLBACK` with
    ///   fewer than two.
    pub fn build(config: &GatewayConfig, client: &HttpClient) -> Result<Self, ConfigError> {
        if config.upstreams.is_empty() {
            return Err(ConfigError::NoUpstreams);
        }

        let raw_transaction_url = parse_optional_url(config.send_raw_transaction_url.as_deref())?;
        let archive_url = parse_optional_url(config.old_trie_url.as_deref())?;

        let mut handles: Vec<Arc<dyn UpstreamHandle>> = Vec::with_capacity(config.upstreams.len());
        for upstream_url in &config.upstreams {
            let primary = parse_url(upstream_url)?;
            handles.push(Arc::new(HttpUpstream::new(
                primary,
                archive_url.clone(),
                raw_transaction_url.clone(),
                client.clone(),
            )));
        }
        let upstreams: Upstreams = Arc::new(handles);

        let strategy = build_strategy(&config.strategy, &upstreams)?;

        Ok(Self {
            upstreams,
            strategy,
            method_limitation_enabled: config.method_limitation_enabled,
            contract_limitation_enabled: config.contract_limitation_enabled,
            allowed_methods: config.allowed_methods.iter().cloned().collect(),
            allowed_contracts: config
                .allowed_contracts
                .iter()
                .map(|address| address.to_lowercase())
                .collect(),
        })
    }

    pub fn upstreams(&self) -> &Upstreams {
        &self.upstreams
    }

    pub fn strategy(&self) -> &Arc<dyn Strategy> {
        &self.strategy
    }

    pub fn method_limitation_enabled(&self) -> bool {
        self.method_limitation_enabled
    }

    pub fn is_allowed_method(&self, method: &str) -> bool {
        self.allowed_methods.contains(method)
    }

    /// Case-insensitive contract allow-list check. When contract
    /// limitation is disabled every address is allowed.
    pub fn is_allowed_contract(&self, address: &str) -> bool {
        if !self.contract_limitation_enabled {
            return true;
        }
        self.allowed_contracts.contains(&address.to_lowercase())
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

fn parse_optional_url(raw: Option<&str>) -> Result<Option<Url>, ConfigError> {
    match raw {
        None | Some("") => Ok(None),
        Some(value) => parse_url(value).map(Some),
    }
}

fn build_strategy(name: &str, upstreams: &Upstreams) -> Result<Arc<dyn Strategy>, ConfigError> {
    let count = upstreams.len();
    match name {
        "NAIVE" => {
            if count > 1 {
                return Err(ConfigError::UpstreamCount {
                    strategy: "NAIVE",
                    requirement: "exactly 1 upstream",
                    actual: count,
                });
            }
            Ok(Arc::new(NaiveProxy::new(Arc::clone(upstreams))))
        }
        "RACE" => {
            if count < 2 {
                return Err(ConfigError::UpstreamCount {
                    strategy: "RACE",
                    requirement: "more than 1 upstream",
                    actual: count,
                });
            }
            Ok(Arc::new(RaceProxy::new(Arc::clone(upstreams))))
        }
        "FALLBACK" => {
            if count < 2 {
                return Err(ConfigError::UpstreamCount {
                    strategy: "FALLBACK",
                    requirement: "more than 1 upstream",
                    actual: count,
                });
            }
            Ok(Arc::new(FallbackProxy::new(Arc::clone(upstreams))))
        }
        other => Err(ConfigError::UnknownStrategy(other.to_string())),
    }
}

/// Cheaply cloneable handle to the process-wide current [`RunningConfig`].
///
/// Replacement is atomic: a reader either sees the previous snapshot or
/// the next one, never a half-built config. The previous snapshot is
/// dropped once its last in-flight reader finishes.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<RunningConfig>>,
}

impl ConfigHandle {
    pub fn new(initial: RunningConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// The current snapshot. Hold it for at most one request.
    pub fn current(&self) -> Arc<RunningConfig> {
        self.inner.load_full()
    }

    pub(crate) fn swap(&self, next: RunningConfig) {
        self.inner.store(Arc::new(next));
    }
}
