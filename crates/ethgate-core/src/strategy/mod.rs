//! The dispatch strategy engine.
//!
//! A strategy takes one validated request and produces response bytes or
//! an error, once per inbound call. Which strategy is active is decided
//! at config-build time; the instance is bound to the upstream sequence
//! of its [`RunningConfig`](crate::config::RunningConfig) snapshot, so a
//! hot reload swaps strategy and upstreams together.

mod fallback;
mod naive;
mod race;

pub use fallback::FallbackProxy;
pub use naive::NaiveProxy;
pub use race::RaceProxy;

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::GatewayError;
use crate::request::Request;
use crate::upstream::UpstreamHandle;

/// The single capability every dispatch policy implements.
///
/// Implementations may fan out internally but must return only once a
/// final outcome is determined, and must not retain the request beyond
/// the call.
#[async_trait]
pub trait Strategy: Send + Sync {
    async fn handle(&self, request: &Request) -> Result<Vec<u8>, GatewayError>;
}

/// Upstream sequence shared between a strategy and its config snapshot.
pub type Upstreams = Arc<Vec<Arc<dyn UpstreamHandle>>>;
