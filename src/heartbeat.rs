// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Session liveness tracking.
//!
//! Long-running clients register a session bound to a Discord message and
//! ping it periodically. A sweep removes every session whose last ping is
//! older than the timeout and edits its message to a disconnected state.
//! Expired sessions leave the table before the edit is attempted, so each
//! expiry produces exactly one edit attempt, and a failed edit is logged
//! without retry.

use crate::config::HeartbeatConfig;
use crate::error::{RelayError, Result};
use crate::relay::Relay;
use crate::validator::SessionRegistration;
use crate::window::Timestamp;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const UNKNOWN_SESSION: &str = "Unknown session";

/// One tracked client session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    /// Real Discord webhook URL or a vault identifier
    pub webhook: String,
    pub message_id: String,
    pub channel_id: Option<String>,
    pub embed_template: Value,
    pub last_heartbeat: Timestamp,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub edited: usize,
    pub failed: usize,
}

/// Session table keyed by session id.
pub struct SessionRegistry {
    timeout_secs: f64,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(config: &HeartbeatConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs as f64,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a session. Last write wins.
    pub async fn register(&self, registration: SessionRegistration, now: Timestamp) {
        let session = Session {
            session_id: registration.session_id,
            webhook: registration.webhook,
            message_id: registration.message_id,
            channel_id: registration.channel_id,
            embed_template: registration.embed,
            last_heartbeat: now,
        };
        debug!(session_id = %session.session_id, "Session registered");
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session);
    }

    /// Refresh a session's heartbeat.
    pub async fn ping(&self, session_id: &str, now: Timestamp) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.last_heartbeat = now;
                Ok(())
            }
            None => Err(RelayError::NotFound(UNKNOWN_SESSION)),
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove and return every session silent for longer than the timeout.
    pub async fn take_expired(&self, now: Timestamp) -> Vec<Session> {
        let mut sessions = self.sessions.write().await;
        let expired_ids: Vec<String> = sessions
            .values()
            .filter(|s| now - s.last_heartbeat > self.timeout_secs)
            .map(|s| s.session_id.clone())
            .collect();
        expired_ids
            .iter()
            .filter_map(|id| sessions.remove(id))
            .collect()
    }

    /// Disconnect every expired session. A failed edit never stops the
    /// sweep of the remaining sessions.
    pub async fn sweep(&self, relay: &Relay, now: Timestamp) -> SweepReport {
        let expired = self.take_expired(now).await;
        let mut report = SweepReport {
            expired: expired.len(),
            ..Default::default()
        };

        for session in expired {
            match relay
                .edit_to_disconnected(&session.webhook, &session.message_id, &session.embed_template)
                .await
            {
                Ok(_) => {
                    report.edited += 1;
                    info!(session_id = %session.session_id, "Session timed out, message marked disconnected");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(session_id = %session.session_id, error = %e, "Session timed out, disconnect edit failed");
                }
            }
        }

        report
    }
}
