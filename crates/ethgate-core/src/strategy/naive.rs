use async_trait::async_trait;

use crate::errors::GatewayError;
use crate::request::Request;

use super::{Strategy, Upstreams};

/// Unconditional forwarding to the single configured upstream.
///
/// Config build guarantees exactly one upstream is present when this
/// strategy is selected.
pub struct NaiveProxy {
    upstreams: Upstreams,
}

impl NaiveProxy {
    pub fn new(upstreams: Upstreams) -> Self {
        Self { upstreams }
    }
}

#[async_trait]
impl Strategy for NaiveProxy {
    async fn handle(&self, request: &Request) -> Result<Vec<u8>, GatewayError> {
        let upstream = &self.upstreams[0];
        let body = upstream.forward(request).await?;
        Ok(body)
    }
}
