// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window event counters.
//!
//! Every admission rule keeps one [`SlidingWindow`] keyed by whatever it
//! counts (client IP, webhook identifier, IP + content fingerprint). A key's
//! log is pruned to the counter's retention window on each `record`, and
//! window counts are a linear scan of the surviving timestamps. Volumes are
//! bounded by the limits themselves, so a plain `Vec` is enough.

use crate::config::WindowLimit;
use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::RwLock;

/// Event time in seconds since the Unix epoch.
pub type Timestamp = f64;

/// Current wall-clock time as a [`Timestamp`].
pub fn unix_now() -> Timestamp {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Ordered event timestamps for one key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    entries: Vec<Timestamp>,
}

impl EventLog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Timestamp] {
        &self.entries
    }

    fn prune(&mut self, now: Timestamp, retention_secs: f64) {
        self.entries.retain(|t| now - t < retention_secs);
    }
}

/// Number of entries with `now - entry < window_secs`.
pub fn count_within(log: &EventLog, now: Timestamp, window_secs: f64) -> usize {
    log.entries.iter().filter(|t| now - **t < window_secs).count()
}

/// First limit in `limits` whose window holds more than `max` events.
pub fn first_exceeded(log: &EventLog, now: Timestamp, limits: &[WindowLimit]) -> Option<WindowLimit> {
    limits
        .iter()
        .copied()
        .find(|limit| count_within(log, now, limit.window_secs as f64) > limit.max as usize)
}

/// Largest window among `limits`, used as a counter's retention.
pub fn retention_for(limits: &[WindowLimit]) -> f64 {
    limits.iter().map(|l| l.window_secs).max().unwrap_or(0) as f64
}

/// Thread-safe per-key event counter.
pub struct SlidingWindow<K> {
    retention_secs: f64,
    logs: RwLock<HashMap<K, EventLog>>,
}

impl<K> SlidingWindow<K>
where
    K: Eq + Hash,
{
    /// Create a counter that keeps `retention_secs` of history per key.
    pub fn new(retention_secs: f64) -> Self {
        Self {
            retention_secs,
            logs: RwLock::new(HashMap::new()),
        }
    }

    /// Create a counter retaining enough history for every limit.
    pub fn for_limits(limits: &[WindowLimit]) -> Self {
        Self::new(retention_for(limits))
    }

    pub fn retention_secs(&self) -> f64 {
        self.retention_secs
    }

    /// Append `now` to the key's log, prune it, and return a snapshot.
    pub async fn record(&self, key: K, now: Timestamp) -> EventLog {
        let mut logs = self.logs.write().await;
        let log = logs.entry(key).or_default();
        log.prune(now, self.retention_secs);
        log.entries.push(now);
        log.clone()
    }

    /// Snapshot of a key's log without recording anything.
    pub async fn snapshot(&self, key: &K) -> EventLog {
        self.logs.read().await.get(key).cloned().unwrap_or_default()
    }

    /// Prune every log and drop keys left empty. Returns the number of
    /// keys removed.
    pub async fn cleanup(&self, now: Timestamp) -> usize {
        let mut logs = self.logs.write().await;
        let before = logs.len();
        logs.retain(|_, log| {
            log.prune(now, self.retention_secs);
            !log.is_empty()
        });
        before - logs.len()
    }

    /// Number of tracked keys.
    pub async fn key_count(&self) -> usize {
        self.logs.read().await.len()
    }
}
