// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! In-process stand-ins for Discord.

use async_trait::async_trait;
use discord_webhook_relay::discord::{with_query, DiscordClient, UpstreamResponse};
use discord_webhook_relay::UpstreamError;
use serde_json::Value;
use std::sync::Mutex;

/// One call the relay made to Discord.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub body: Value,
}

/// Discord fake answering every call with a fixed status and body.
pub struct FakeDiscord {
    status: u16,
    body: String,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeDiscord {
    pub fn responding(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::responding(200, r#"{"id":"1000","type":0}"#)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: RecordedCall) -> UpstreamResponse {
        self.calls.lock().unwrap().push(call);
        UpstreamResponse {
            status: self.status,
            body: self.body.clone(),
            content_type: Some("application/json".to_string()),
        }
    }
}

#[async_trait]
impl DiscordClient for FakeDiscord {
    async fn execute(
        &self,
        webhook_url: &str,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<UpstreamResponse, UpstreamError> {
        Ok(self.answer(RecordedCall {
            method: "POST",
            url: with_query(webhook_url, query),
            body: serde_json::from_slice(body).unwrap_or(Value::Null),
        }))
    }

    async fn edit_message(
        &self,
        webhook_url: &str,
        message_id: &str,
        body: &Value,
    ) -> Result<UpstreamResponse, UpstreamError> {
        Ok(self.answer(RecordedCall {
            method: "PATCH",
            url: format!("{}/messages/{}", webhook_url, message_id),
            body: body.clone(),
        }))
    }
}
