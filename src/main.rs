// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Discord Webhook Relay Service
//!
//! Exposes:
//!
//! - `POST /hit/{id}`: admit and forward a message to the sealed webhook
//! - `POST /register-webhook`: seal a Discord webhook URL, return its id
//! - `POST /status-patch`: HMAC-signed embed edit
//! - `POST /sessions`, `POST /sessions/{id}/ping`: session liveness
//! - `GET /health`, `GET /metrics`
//!
//! ## Configuration
//!
//! - `BIND_ADDR` or `PORT`: listen address (default: 0.0.0.0:8080)
//! - `ENCRYPTION_KEY`: secret the sealing key is derived from
//! - `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY`: record store
//! - `STATUS_SHARED_SECRET`: HMAC secret for `/status-patch`
//! - `HEARTBEAT_TIMEOUT_SECS` (15), `SWEEP_INTERVAL_SECS` (5)
//! - `MAX_PAYLOAD_BYTES` (4000), `UPSTREAM_TIMEOUT_SECS` (10)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use discord_webhook_relay::{
    config::Config,
    discord::HttpDiscordClient,
    handlers::{router, AppState},
    store::{InMemoryStore, RecordStore, SupabaseStore},
    window::unix_now,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        heartbeat_timeout_secs = config.heartbeat.timeout_secs,
        sweep_interval_secs = config.heartbeat.sweep_interval_secs,
        max_payload_bytes = config.rate_limit.max_payload_bytes,
        "Starting Discord webhook relay"
    );

    if config.relay.uses_fallback_secret() {
        warn!("ENCRYPTION_KEY not set, using the built-in fallback secret");
    }
    if config.relay.status_shared_secret.is_none() {
        warn!("STATUS_SHARED_SECRET not set, /status-patch is disabled");
    }

    let timeout = config.relay.upstream_timeout();
    let store: Arc<dyn RecordStore> = match (&config.relay.store_url, &config.relay.store_service_key) {
        (Some(url), Some(key)) => Arc::new(SupabaseStore::new(url.clone(), key.clone(), timeout)?),
        _ => {
            warn!("SUPABASE_URL or SUPABASE_SERVICE_ROLE_KEY missing, records are kept in memory");
            Arc::new(InMemoryStore::new())
        }
    };
    let discord = Arc::new(HttpDiscordClient::new(timeout)?);

    let state = Arc::new(AppState::new(config.clone(), store, discord)?);

    // Liveness sweep; the loop awaits each sweep, so runs never overlap.
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_state.config.heartbeat.sweep_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let report = sweep_state.sweep_sessions(unix_now()).await;
            if report.expired > 0 {
                info!(
                    expired = report.expired,
                    edited = report.edited,
                    failed = report.failed,
                    "Session sweep"
                );
            }
        }
    });

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_state.config.rate_limit.cleanup_interval());
        loop {
            interval.tick().await;
            let removed = cleanup_state.cleanup_counters(unix_now()).await;
            debug!(removed, "Counter cleanup");
        }
    });

    let app = router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
