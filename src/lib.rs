// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Discord Webhook Relay
//!
//! Clients hold an opaque identifier (`wh_...`) instead of a real Discord
//! webhook URL. The relay resolves the identifier to an AES-256-GCM sealed
//! URL, admits the request through anti-abuse rules, and forwards it:
//!
//! - Per-IP volume limits (5/1s, 40/60s, 500/3600s)
//! - Per-webhook volume limits (120/60s, 2000/3600s)
//! - Broadcast-mention spam limits per IP (3/60s, 20/day)
//! - Duplicate-content spam limits per IP (3/60s, 20/day)
//! - Payload size guard (4000 bytes)
//!
//! A session registry tracks heartbeats from long-running clients and marks
//! their Discord message disconnected when pings stop.

pub mod codec;
pub mod config;
pub mod discord;
pub mod error;
pub mod handlers;
pub mod heartbeat;
pub mod limiter;
pub mod metrics;
pub mod payload;
pub mod relay;
pub mod signature;
pub mod store;
pub mod validator;
pub mod window;

pub use config::Config;
pub use error::{RelayError, UpstreamError};
pub use handlers::{router, AppState};
pub use limiter::{AdmissionPipeline, AdmissionResult, RejectReason};
pub use relay::Relay;
pub use validator::{RequestValidator, ValidationError};
