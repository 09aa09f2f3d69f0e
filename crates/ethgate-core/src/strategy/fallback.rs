use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::GatewayError;
use crate::request::Request;
use crate::types::probe_for_error;

use super::{Strategy, Upstreams};

/// How long a slot stays marked unhealthy before a timer restores it.
const RECOVERY_DELAY: Duration = Duration::from_secs(5);

/// One upstream at a time, round-robin among the currently healthy
/// slots, with timed self-recovery.
///
/// This is the only stateful policy: the cursor and per-slot health are
/// shared across concurrent requests and the delayed-recovery timers.
/// All transitions go through a single mutex, so every read and write of
/// the state is linearizable.
pub struct FallbackProxy {
    upstreams: Upstreams,
    state: Arc<Mutex<DispatchState>>,
    recovery_delay: Duration,
}

struct DispatchState {
    /// Where the next scan starts.
    cursor: usize,
    /// Per-slot "usable now" flags, indexed like the upstream sequence.
    healthy: Vec<bool>,
}

impl DispatchState {
    /// First healthy slot strictly after `index`, wrapping around;
    /// `index` itself if nothing else is healthy.
    fn next_healthy_after(&self, index: usize) -> usize {
        let n = self.healthy.len();
        (1..n)
            .map(|offset| (index + offset) % n)
            .find(|&candidate| self.healthy[candidate])
            .unwrap_or(index)
    }
}

impl FallbackProxy {
    pub fn new(upstreams: Upstreams) -> Self {
        Self::with_recovery_delay(upstreams, RECOVERY_DELAY)
    }

    pub fn with_recovery_delay(upstreams: Upstreams, recovery_delay: Duration) -> Self {
        let slots = upstreams.len();
        Self {
            upstreams,
            state: Arc::new(Mutex::new(DispatchState {
                cursor: 0,
                healthy: vec![true; slots],
            })),
            recovery_delay,
        }
    }

    /// Marks a slot unhealthy, advances the shared cursor past it and
    /// schedules the slot's recovery. One atomic transition.
    fn mark_failed(&self, index: usize) {
        let next = {
            let mut state = self.state.lock();
            state.healthy[index] = false;
            state.cursor = (index + 1) % state.healthy.len();
            state.cursor
        };
        tracing::info!(from = index, to = next, "upstream errored, switching");

        let state = Arc::clone(&self.state);
        let delay = self.recovery_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.lock().healthy[index] = true;
            tracing::debug!(slot = index, "upstream health restored");
        });
    }

    /// Records a success: re-asserts the used slot healthy and moves the
    /// cursor to the next healthy slot after it (round robin).
    fn mark_succeeded(&self, index: usize) {
        let mut state = self.state.lock();
        state.healthy[index] = true;
        let next = state.next_healthy_after(index);
        state.cursor = next;
        tracing::debug!(from = index, to = next, "round robin advanced");
    }

    #[cfg(test)]
    fn is_healthy(&self, index: usize) -> bool {
        self.state.lock().healthy[index]
    }
}

#[async_trait]
impl Strategy for FallbackProxy {
    async fn handle(&self, request: &Request) -> Result<Vec<u8>, GatewayError> {
        let total = self.upstreams.len();
        let start = self.state.lock().cursor;

        // At most once around the slot ring per request. A failure along
        // the way is hidden from the client as long as any later slot
        // answers.
        for offset in 0..total {
            let index = (start + offset) % total;
            if !self.state.lock().healthy[index] {
                continue;
            }

            let upstream = &self.upstreams[index];
            match upstream.forward(request).await {
                Ok(body) => {
                    if let Some(probe) = probe_for_error(&body) {
                        tracing::info!(
                            upstream = upstream.name(),
                            id = %probe.id,
                            error = ?probe.error,
                            "upstream answered with rpc error"
                        );
                        self.mark_failed(index);
                        continue;
                    }
                    self.mark_succeeded(index);
                    return Ok(body);
                }
                Err(error) => {
                    tracing::warn!(upstream = upstream.name(), %error, "dispatch failed");
                    self.mark_failed(index);
                }
            }
        }

        Err(GatewayError::NoHealthyUpstream)
    }
}
