// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the relay service.
//!
//! Admission and validation run before any record-store or Discord call,
//! so rejected requests never cost upstream I/O.

use crate::codec::SealingKey;
use crate::config::Config;
use crate::discord::{DiscordClient, UpstreamResponse};
use crate::error::RelayError;
use crate::heartbeat::{SessionRegistry, SweepReport};
use crate::limiter::{AdmissionPipeline, AdmissionResult};
use crate::metrics::RelayMetrics;
use crate::payload::MessagePayload;
use crate::relay::Relay;
use crate::signature::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::store::RecordStore;
use crate::validator::RequestValidator;
use crate::window::{unix_now, Timestamp};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub pipeline: AdmissionPipeline,
    pub relay: Relay,
    pub sessions: SessionRegistry,
    pub validator: RequestValidator,
    pub metrics: RelayMetrics,
    pub config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn RecordStore>,
        discord: Arc<dyn DiscordClient>,
    ) -> prometheus::Result<Self> {
        let key = SealingKey::derive(&config.relay.encryption_secret);
        Ok(Self {
            pipeline: AdmissionPipeline::new(config.rate_limit.clone()),
            relay: Relay::new(store, discord, key),
            sessions: SessionRegistry::new(&config.heartbeat),
            validator: RequestValidator::new(config.rate_limit.max_payload_bytes),
            metrics: RelayMetrics::new()?,
            config,
        })
    }

    /// One liveness sweep, with metrics updated.
    pub async fn sweep_sessions(&self, now: Timestamp) -> SweepReport {
        let report = self.sessions.sweep(&self.relay, now).await;
        self.metrics.record_sweep(&report);
        self.metrics.set_active_sessions(self.sessions.len().await);
        report
    }

    /// Drop admission keys whose history has aged out.
    pub async fn cleanup_counters(&self, now: Timestamp) -> usize {
        self.pipeline.cleanup(now).await
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the public router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/hit", post(missing_identifier).fallback(method_not_allowed))
        .route("/hit/", post(missing_identifier).fallback(method_not_allowed))
        .route("/hit/:identifier", post(hit).fallback(method_not_allowed))
        .route(
            "/register-webhook",
            post(register_webhook).fallback(method_not_allowed),
        )
        .route(
            "/status-patch",
            post(status_patch)
                .patch(status_patch)
                .fallback(method_not_allowed),
        )
        .route("/sessions", post(register_session).fallback(method_not_allowed))
        .route(
            "/sessions/:session_id/ping",
            post(ping_session).fallback(method_not_allowed),
        );

    if state.config.metrics.enabled {
        let path = state.config.metrics.path.clone();
        router = router.route(&path, get(metrics));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "discord-webhook-relay",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn method_not_allowed() -> RelayError {
    RelayError::MethodNotAllowed
}

pub async fn missing_identifier() -> RelayError {
    RelayError::from(crate::validator::ValidationError::MissingIdentifier)
}

/// Client address: first `X-Forwarded-For` hop, else the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parse a JSON body, treating empty, malformed or `null` bodies as `{}`.
fn parse_body(body: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Null) | Err(_) => json!({}),
        Ok(value) => value,
    }
}

/// Mirror a Discord response: same status, body and content type.
fn mirror(upstream: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok());

    let mut response = (status, upstream.body).into_response();
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

/// Forward a message to the webhook behind `identifier`.
pub async fn hit(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    RawQuery(query): RawQuery,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RelayError> {
    let identifier = state.validator.validate_identifier(Some(identifier.as_str()))?;

    let value = parse_body(&body);
    let raw = serde_json::to_vec(&value).unwrap_or_else(|_| b"{}".to_vec());
    if !state.validator.payload_fits(raw.len()) {
        debug!(%identifier, bytes = raw.len(), "Payload too large");
        return Err(RelayError::PayloadTooLarge);
    }

    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let payload = MessagePayload::from_value(&value);
    let admission = state.pipeline.admit(&ip, identifier, &payload, unix_now()).await;
    state.metrics.record_admission(&admission);

    if let AdmissionResult::Limited { reason, limit } = admission {
        info!(
            %ip,
            %identifier,
            reason = reason.code(),
            window_secs = limit.window_secs,
            "Request rate limited"
        );
        return Err(RelayError::RateLimited(reason));
    }

    let upstream = state.relay.forward(identifier, query.as_deref(), &raw).await?;
    state.metrics.record_forward(upstream.status);
    debug!(%ip, %identifier, status = upstream.status, "Request relayed");
    Ok(mirror(upstream))
}

/// Seal and store a new webhook, returning its public identifier.
pub async fn register_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let registration = state.validator.validate_registration(&parse_body(&body))?;
    let id = state.relay.register(&registration).await?;
    Ok(Json(json!({ "id": id })))
}

/// Signed embed edit on behalf of the status service.
pub async fn status_patch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RelayError> {
    let Some(secret) = state.config.relay.status_shared_secret.as_deref() else {
        return Err(RelayError::Misconfigured("STATUS_SHARED_SECRET not set"));
    };

    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let verified = match (header_str(TIMESTAMP_HEADER), header_str(SIGNATURE_HEADER)) {
        (Some(timestamp), Some(sig)) => signature::verify(timestamp, &body, sig, secret),
        _ => false,
    };
    if !verified {
        warn!("Status patch with invalid signature");
        return Err(RelayError::Auth);
    }

    let patch = state.validator.validate_status_patch(&parse_body(&body))?;
    if !state.validator.payload_fits(body.len()) {
        return Err(RelayError::PayloadTooLarge);
    }

    let upstream = state
        .relay
        .patch_embeds(&patch.vault_id, &patch.message_id, patch.embeds)
        .await?;
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(upstream.json_or_raw())).into_response())
}

/// Start tracking a session.
pub async fn register_session(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let registration = state.validator.validate_session(&parse_body(&body))?;
    let session_id = registration.session_id.clone();
    state.sessions.register(registration, unix_now()).await;
    state.metrics.set_active_sessions(state.sessions.len().await);
    Ok(Json(json!({ "ok": true, "session_id": session_id })))
}

/// Refresh a session heartbeat.
pub async fn ping_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, RelayError> {
    state.sessions.ping(&session_id, unix_now()).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
