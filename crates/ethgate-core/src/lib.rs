//! # Ethgate Core
//!
//! Core library for ethgate, a JSON-RPC gateway that fronts one or more
//! Ethereum node endpoints and exposes a single HTTP endpoint to clients.
//!
//! This crate provides:
//!
//! - **[`request`]**: Decoding and validation of inbound JSON-RPC calls,
//!   including method/contract allow-listing and raw-transaction recipient
//!   extraction, plus archive-state classification against the chain head.
//!
//! - **[`strategy`]**: Three interchangeable dispatch policies — naive
//!   (single upstream), race (parallel fan-out, first qualifying result
//!   wins) and fallback (round-robin among healthy upstreams with timed
//!   self-recovery).
//!
//! - **[`config`]**: The immutable, atomically-swapped running
//!   configuration and the polling controller that hot-reloads it.
//!
//! - **[`upstream`]**: The upstream capability seam and its HTTP-backed
//!   implementation.
//!
//! - **[`chain`]**: Shared chain-head tracking that feeds archive
//!   classification.
//!
//! ## Request flow
//!
//! ```text
//! HTTP body ──► Request::decode (batch reject, allow-lists)
//!                    │
//!                    ▼
//!           classify_archive(ChainState)
//!                    │
//!                    ▼
//!           RunningConfig snapshot ──► Strategy::handle
//!                                           │
//!                              ┌────────────┼────────────┐
//!                              ▼            ▼            ▼
//!                            Naive        Race       Fallback
//!                              │            │            │
//!                              └────────────┴────────────┘
//!                                           │
//!                                           ▼
//!                                  response bytes / error
//! ```
//!
//! Validation failures never reach a strategy, and strategy failures are
//! reported as one opaque [`errors::GatewayError`] reason — the HTTP layer
//! owns the mapping to wire-level codes.

pub mod chain;
pub mod config;
pub mod errors;
pub mod request;
pub mod strategy;
pub mod types;
pub mod upstream;
