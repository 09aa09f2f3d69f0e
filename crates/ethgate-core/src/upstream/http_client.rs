use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Client, ClientBuilder};
use url::Url;

use crate::errors::UpstreamError;

/// Total per-request timeout applied by the shared client. Generous on
/// purpose: the race strategy imposes its own, tighter deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared HTTP client for all upstream traffic.
///
/// Built once at startup and cloned into every upstream handle (cloning
/// reuses the underlying connection pool). Keeping a single pool means a
/// hot config reload does not tear down established connections.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates the shared client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client })
    }

    /// Posts a raw JSON body and returns the response bytes.
    ///
    /// Non-2xx statuses are reported as [`UpstreamError::HttpStatus`];
    /// the body of such responses is discarded. A 2xx body is returned
    /// verbatim — JSON-RPC-level error classification is the caller's
    /// concern.
    pub async fn post_raw(&self, url: &Url, body: Bytes) -> Result<Vec<u8>, UpstreamError> {
        let response = self
            .client
            .post(url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::HttpStatus(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
