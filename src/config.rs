// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the Discord webhook relay.
//!
//! Values are read from the environment at startup. Admission thresholds
//! default to the relay's anti-abuse policy and are expressed as lists of
//! `(window, max)` limits so each rule can check several windows at once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Fallback secret used when `ENCRYPTION_KEY` is unset.
pub const FALLBACK_ENCRYPTION_SECRET: &str = "CHANGE_THIS_TO_A_LONG_SECRET";

/// Configuration for the relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Admission thresholds
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Secrets and upstream endpoints
    #[serde(default)]
    pub relay: RelayConfig,

    /// Session liveness tracking
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// One sliding-window limit: more than `max` events inside the last
/// `window_secs` seconds rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowLimit {
    pub window_secs: u64,
    pub max: u32,
}

impl WindowLimit {
    pub const fn new(window_secs: u64, max: u32) -> Self {
        Self { window_secs, max }
    }
}

/// Admission thresholds, one list of window limits per rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Per-client-IP volume (default: 5/1s, 40/60s, 500/3600s)
    #[serde(default = "default_ip_limits")]
    pub ip: Vec<WindowLimit>,

    /// Per-webhook-identifier volume (default: 120/60s, 2000/3600s)
    #[serde(default = "default_webhook_limits")]
    pub webhook: Vec<WindowLimit>,

    /// Broadcast mentions per IP (default: 3/60s, 20/86400s)
    #[serde(default = "default_abuse_limits")]
    pub mention: Vec<WindowLimit>,

    /// Identical normalized text per IP (default: 3/60s, 20/86400s)
    #[serde(default = "default_abuse_limits")]
    pub duplicate: Vec<WindowLimit>,

    /// Tokens that notify a whole channel, matched case-insensitively
    #[serde(default = "default_broadcast_tokens")]
    pub broadcast_tokens: Vec<String>,

    /// Maximum serialized payload size in bytes (default: 4000)
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Interval between idle-key cleanups in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Secrets and upstream endpoints.
#[derive(Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Secret the sealing key is derived from
    #[serde(default = "default_encryption_secret")]
    pub encryption_secret: String,

    /// Base URL of the record store (Supabase project URL)
    #[serde(default)]
    pub store_url: Option<String>,

    /// Service-role credential for the record store
    #[serde(default)]
    pub store_service_key: Option<String>,

    /// Shared secret for signed status-patch requests
    #[serde(default)]
    pub status_shared_secret: Option<String>,

    /// Timeout for record-store and Discord calls in seconds (default: 10)
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

/// Session liveness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Seconds without a ping before a session is disconnected (default: 15)
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds between sweeps (default: 5)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_ip_limits() -> Vec<WindowLimit> {
    vec![
        WindowLimit::new(1, 5),
        WindowLimit::new(60, 40),
        WindowLimit::new(3600, 500),
    ]
}

fn default_webhook_limits() -> Vec<WindowLimit> {
    vec![WindowLimit::new(60, 120), WindowLimit::new(3600, 2000)]
}

fn default_abuse_limits() -> Vec<WindowLimit> {
    vec![WindowLimit::new(60, 3), WindowLimit::new(86400, 20)]
}

fn default_broadcast_tokens() -> Vec<String> {
    vec!["@everyone".to_string(), "@here".to_string()]
}

fn default_max_payload_bytes() -> usize {
    4000
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_encryption_secret() -> String {
    FALLBACK_ENCRYPTION_SECRET.to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_heartbeat_timeout_secs() -> u64 {
    15
}

fn default_sweep_interval_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            relay: RelayConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip: default_ip_limits(),
            webhook: default_webhook_limits(),
            mention: default_abuse_limits(),
            duplicate: default_abuse_limits(),
            broadcast_tokens: default_broadcast_tokens(),
            max_payload_bytes: default_max_payload_bytes(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            encryption_secret: default_encryption_secret(),
            store_url: None,
            store_service_key: None,
            status_shared_secret: None,
            upstream_timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_heartbeat_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("encryption_secret", &"<redacted>")
            .field("store_url", &self.store_url)
            .field("store_service_key", &self.store_service_key.as_ref().map(|_| "<redacted>"))
            .field(
                "status_shared_secret",
                &self.status_shared_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .finish()
    }
}

impl RateLimitConfig {
    /// Get the idle-key cleanup interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl RelayConfig {
    /// Whether the encryption secret is still the built-in fallback.
    pub fn uses_fallback_secret(&self) -> bool {
        self.encryption_secret == FALLBACK_ENCRYPTION_SECRET
    }

    /// Get the upstream call timeout
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

impl HeartbeatConfig {
    /// Get the sweep interval
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset, empty or unparseable numeric values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parsed = |key: &str| {
            var(key).and_then(|v| match v.trim().parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!(key, value = %v, "Ignoring unparseable numeric setting");
                    None
                }
            })
        };

        let bind_addr = var("BIND_ADDR")
            .or_else(|| var("PORT").map(|port| format!("0.0.0.0:{}", port.trim())))
            .unwrap_or_else(default_bind_addr);

        let defaults = Config::default();

        Config {
            bind_addr,
            rate_limit: RateLimitConfig {
                max_payload_bytes: parsed("MAX_PAYLOAD_BYTES")
                    .map(|n| n as usize)
                    .unwrap_or(defaults.rate_limit.max_payload_bytes),
                ..defaults.rate_limit
            },
            relay: RelayConfig {
                encryption_secret: var("ENCRYPTION_KEY").unwrap_or_else(default_encryption_secret),
                store_url: var("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
                store_service_key: var("SUPABASE_SERVICE_ROLE_KEY"),
                status_shared_secret: var("STATUS_SHARED_SECRET"),
                upstream_timeout_secs: parsed("UPSTREAM_TIMEOUT_SECS")
                    .unwrap_or(defaults.relay.upstream_timeout_secs),
            },
            heartbeat: HeartbeatConfig {
                timeout_secs: parsed("HEARTBEAT_TIMEOUT_SECS")
                    .unwrap_or(defaults.heartbeat.timeout_secs),
                sweep_interval_secs: parsed("SWEEP_INTERVAL_SECS")
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.heartbeat.sweep_interval_secs),
            },
            metrics: MetricsConfig {
                enabled: var("METRICS_ENABLED")
                    .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                    .unwrap_or(defaults.metrics.enabled),
                ..defaults.metrics
            },
        }
    }
}
