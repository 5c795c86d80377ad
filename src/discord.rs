// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound calls to Discord webhook endpoints.

use crate::error::UpstreamError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Status, body and content type of a Discord response, relayed as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as JSON, or `{"raw": body}` when it is not JSON.
    pub fn json_or_raw(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| serde_json::json!({ "raw": self.body }))
    }
}

/// Client for Discord's webhook API.
#[async_trait]
pub trait DiscordClient: Send + Sync {
    /// `POST {webhook_url}[?query]` with a raw JSON body.
    async fn execute(
        &self,
        webhook_url: &str,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<UpstreamResponse, UpstreamError>;

    /// `PATCH {webhook_url}/messages/{message_id}` with a JSON body.
    async fn edit_message(
        &self,
        webhook_url: &str,
        message_id: &str,
        body: &Value,
    ) -> Result<UpstreamResponse, UpstreamError>;
}

/// Append a raw query string, joining with `&` when the URL already has one.
pub fn with_query(webhook_url: &str, query: Option<&str>) -> String {
    match query.map(|q| q.trim_start_matches('?')).filter(|q| !q.is_empty()) {
        Some(query) => {
            let separator = if webhook_url.contains('?') { '&' } else { '?' };
            format!("{}{}{}", webhook_url, separator, query)
        }
        None => webhook_url.to_string(),
    }
}

/// URL of one message under a webhook, with the id percent-encoded.
pub fn message_url(webhook_url: &str, message_id: &str) -> Result<Url, UpstreamError> {
    let mut url = Url::parse(webhook_url).map_err(|_| UpstreamError::Malformed("webhook URL does not parse".to_string()))?;
    url.path_segments_mut()
        .map_err(|_| UpstreamError::Malformed("webhook URL cannot carry a path".to_string()))?
        .pop_if_empty()
        .push("messages")
        .push(message_id);
    Ok(url)
}

/// reqwest-backed Discord client.
pub struct HttpDiscordClient {
    client: reqwest::Client,
}

impl HttpDiscordClient {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn relay(response: reqwest::Response) -> Result<UpstreamResponse, UpstreamError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(UpstreamResponse {
            status,
            body,
            content_type,
        })
    }
}

#[async_trait]
impl DiscordClient for HttpDiscordClient {
    async fn execute(
        &self,
        webhook_url: &str,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<UpstreamResponse, UpstreamError> {
        let response = self
            .client
            .post(with_query(webhook_url, query))
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await?;
        debug!(status = response.status().as_u16(), "Discord execute");
        Self::relay(response).await
    }

    async fn edit_message(
        &self,
        webhook_url: &str,
        message_id: &str,
        body: &Value,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let response = self
            .client
            .patch(message_url(webhook_url, message_id)?)
            .json(body)
            .send()
            .await?;
        debug!(status = response.status().as_u16(), "Discord edit message");
        Self::relay(response).await
    }
}
