//! Chain-head tracking.
//!
//! Archive classification needs to know how far behind the head a
//! requested block is. The head is polled through the gateway's own
//! dispatch path (so it honors the active strategy and its failover)
//! and stored for lock-free reads on every request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::ConfigHandle;
use crate::request::Request;
use crate::types::JsonRpcCall;

/// Roughly one mainnet block time.
const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Current chain head, 0 while unknown.
///
/// 0 is deliberate: archive classification treats an unknown head as
/// "nothing is archived", so the gateway stays permissive until the
/// first successful poll.
#[derive(Debug, Default)]
pub struct ChainState {
    head: AtomicU64,
}

#[derive(Deserialize)]
struct BlockNumberResult {
    #[serde(default)]
    result: Option<String>,
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> u64 {
        self.head.load(Ordering::Acquire)
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::Release);
    }

    /// Spawns the `eth_blockNumber` poller. Failures leave the previous
    /// head in place; the loop stops on the shutdown signal.
    pub fn spawn_poller(
        self: &Arc<Self>,
        config: ConfigHandle,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => state.poll_once(&config).await,
                    _ = shutdown.recv() => {
                        tracing::info!("chain head polling stopped");
                        return;
                    }
                }
            }
        })
    }

    async fn poll_once(&self, config: &ConfigHandle) {
        let Some(request) = block_number_probe() else {
            return;
        };
        let snapshot = config.current();

        match snapshot.strategy().handle(&request).await {
            Ok(body) => match parse_block_number_body(&body) {
                Some(head) => {
                    self.set_head(head);
                    tracing::trace!(head, "chain head updated");
                }
                None => tracing::warn!("unparseable eth_blockNumber response"),
            },
            Err(error) => tracing::warn!(%error, "chain head poll failed"),
        }
    }
}

fn block_number_probe() -> Option<Request> {
    let call = JsonRpcCall {
        jsonrpc: crate::types::JSONRPC_VERSION.to_string(),
        id: serde_json::json!(0),
        method: "eth_blockNumber".to_string(),
        params: Vec::new(),
    };
    let raw = serde_json::to_vec(&call).ok()?;
    Some(Request::from_parts(call, Bytes::from(raw)))
}

fn parse_block_number_body(body: &[u8]) -> Option<u64> {
    let parsed: BlockNumberResult = serde_json::from_slice(body).ok()?;
    let result = parsed.result?;
    let digits = result.strip_prefix("0x")?;
    u64::from_str_radix(digits, 16).ok()
}
