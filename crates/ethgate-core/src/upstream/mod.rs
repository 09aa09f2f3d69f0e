//! The upstream capability seam and its HTTP-backed implementation.
//!
//! Strategies only ever see [`UpstreamHandle`]: a name for logging and a
//! single `forward` capability. How the bytes actually travel (client
//! pooling, TLS, retries) is this module's concern alone, which also
//! keeps strategy tests free of network I/O.

mod http_client;

pub use http_client::HttpClient;

use async_trait::async_trait;
use url::Url;

use crate::errors::UpstreamError;
use crate::request::Request;

/// One backing Ethereum node endpoint.
///
/// `forward` returns an error only on definitive transport failure;
/// otherwise it returns the raw upstream response body, even when that
/// body carries a JSON-RPC-level error.
#[async_trait]
pub trait UpstreamHandle: Send + Sync {
    /// Stable identity used in logs.
    fn name(&self) -> &str;

    /// Forwards the original request bytes and returns the response body.
    async fn forward(&self, request: &Request) -> Result<Vec<u8>, UpstreamError>;
}

/// HTTP upstream with per-purpose endpoint selection.
///
/// A node operator can point raw-transaction submissions at a dedicated
/// sequencer/relay endpoint and historical-state queries at an archive
/// node while everything else hits the primary. Either override falls
/// back to the primary URL when unset.
pub struct HttpUpstream {
    name: String,
    primary: Url,
    archive: Url,
    raw_transaction: Url,
    client: HttpClient,
}

impl HttpUpstream {
    pub fn new(
        primary: Url,
        archive: Option<Url>,
        raw_transaction: Option<Url>,
        client: HttpClient,
    ) -> Self {
        let name = primary.to_string();
        let archive = archive.unwrap_or_else(|| primary.clone());
        let raw_transaction = raw_transaction.unwrap_or_else(|| primary.clone());
        Self {
            name,
            primary,
            archive,
            raw_transaction,
            client,
        }
    }

    fn endpoint_for(&self, request: &Request) -> &Url {
        if request.is_send_raw_transaction() {
            &self.raw_transaction
        } else if request.is_archive_data_request() {
            &self.archive
        } else {
            &self.primary
        }
    }
}

#[async_trait]
impl UpstreamHandle for HttpUpstream {
    fn name(&self) -> &str {
        &self.name
    }

    async fn forward(&self, request: &Request) -> Result<Vec<u8>, UpstreamError> {
        let url = self.endpoint_for(request);
        tracing::trace!(upstream = %self.name, url = %url, method = request.method(), "forwarding");
        self.client.post_raw(url, request.raw_body()).await
    }
}
