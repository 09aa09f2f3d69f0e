use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;

use crate::errors::GatewayError;
use crate::request::Request;
use crate::types::probe_for_error;

use super::{Strategy, Upstreams};

/// Global deadline for one raced request.
const RACE_DEADLINE: Duration = Duration::from_secs(10);

/// Parallel fan-out: dispatch to every upstream at once, first
/// qualifying result wins.
///
/// Resolution policy, first match wins:
///
/// 1. the global deadline elapses with no definitive outcome — timeout;
/// 2. any upstream returns a body free of JSON-RPC-level errors — that
///    body, immediately;
/// 3. any upstream returns a body *carrying* a JSON-RPC-level error —
///    that body, immediately (a node-side error is still a response and
///    is surfaced rather than masked);
/// 4. every upstream transport-failed — all-failed error.
///
/// A panic inside one dispatch is contained and counted as that
/// upstream's transport failure.
pub struct RaceProxy {
    upstreams: Upstreams,
    deadline: Duration,
}

enum Outcome {
    /// Transport success, body free of JSON-RPC errors.
    Clean(Vec<u8>),
    /// Transport success, body carries a JSON-RPC-level error.
    RpcError(Vec<u8>),
    /// Definitive transport failure (or contained panic).
    TransportFailed,
}

impl RaceProxy {
    pub fn new(upstreams: Upstreams) -> Self {
        Self::with_deadline(upstreams, RACE_DEADLINE)
    }

    pub fn with_deadline(upstreams: Upstreams, deadline: Duration) -> Self {
        Self { upstreams, deadline }
    }
}

#[async_trait]
impl Strategy for RaceProxy {
    async fn handle(&self, request: &Request) -> Result<Vec<u8>, GatewayError> {
        let started = Instant::now();
        let total = self.upstreams.len();
        let (tx, mut rx) = mpsc::channel::<Outcome>(total);

        for upstream in self.upstreams.iter() {
            let upstream = Arc::clone(upstream);
            let request = request.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let dispatch = AssertUnwindSafe(upstream.forward(&request)).catch_unwind();
                let outcome = match dispatch.await {
                    Ok(Ok(body)) => {
                        if probe_for_error(&body).is_none() {
                            Outcome::Clean(body)
                        } else {
                            tracing::debug!(upstream = upstream.name(), "body carries rpc error");
                            Outcome::RpcError(body)
                        }
                    }
                    Ok(Err(error)) => {
                        tracing::debug!(upstream = upstream.name(), %error, "dispatch failed");
                        Outcome::TransportFailed
                    }
                    Err(_) => {
                        tracing::warn!(upstream = upstream.name(), "dispatch panicked");
                        Outcome::TransportFailed
                    }
                };
                // The receiver may be gone already if another upstream won.
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);
        let mut failures = 0usize;

        loop {
            tokio::select! {
                () = &mut deadline => {
                    tracing::debug!(elapsed = ?started.elapsed(), "race deadline elapsed");
                    return Err(GatewayError::Timeout);
                }
                received = rx.recv() => match received {
                    Some(Outcome::Clean(body)) => {
                        tracing::debug!(elapsed = ?started.elapsed(), "race won cleanly");
                        return Ok(body);
                    }
                    Some(Outcome::RpcError(body)) => return Ok(body),
                    Some(Outcome::TransportFailed) => {
                        failures += 1;
                        if failures == total {
                            tracing::error!(elapsed = ?started.elapsed(), "every upstream failed");
                            return Err(GatewayError::AllUpstreamsFailed);
                        }
                    }
                    None => return Err(GatewayError::AllUpstreamsFailed),
                }
            }
        }
    }
}
