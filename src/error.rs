// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the relay and their HTTP mapping.

use crate::codec::CodecError;
use crate::limiter::RejectReason;
use crate::validator::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failure talking to the record store or Discord.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected upstream response: {0}")]
    Malformed(String),
}

// Request URLs carry webhook tokens; they never reach a rendered error.
impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Transport(e.without_url())
    }
}

/// Application error types
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("{0}")]
    RateLimited(RejectReason),

    #[error("invalid signature")]
    Auth,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Misconfigured(&'static str),

    #[error("upstream failure: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("decryption failure: {0}")]
    Decryption(#[from] CodecError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Misconfigured(_) | Self::Upstream(_) | Self::Decryption(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Upstream(_) | Self::Decryption(_) => {
                error!(error = %self, "Request failed");
                ErrorResponse {
                    error: "Internal error".to_string(),
                    reason: None,
                }
            }
            Self::RateLimited(reason) => ErrorResponse {
                error: reason.to_string(),
                reason: Some(reason.code()),
            },
            other => ErrorResponse {
                error: other.to_string(),
                reason: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;
