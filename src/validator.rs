// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request validation for the relay endpoints.
//!
//! - Webhook identifier presence
//! - Discord webhook URL checks (host and `/api/webhooks/` path)
//! - Registration, status-patch and session body shapes
//! - Payload size guard

use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Hosts (and their subdomains) that serve Discord webhooks.
const DISCORD_HOSTS: &[&str] = &["discord.com", "discordapp.com"];

/// Path segment every Discord webhook URL carries.
const WEBHOOK_PATH: &str = "/api/webhooks/";

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing id")]
    MissingIdentifier,

    #[error("owner_discord_id and webhook_url are required")]
    MissingRegistrationFields,

    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Not a valid Discord webhook URL")]
    NotDiscordWebhook,

    #[error("vault_id, message_id, embeds required")]
    MissingPatchFields,

    #[error("session_id, webhook, message_id, embed required")]
    MissingSessionFields,
}

/// A validated webhook registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub owner_id: String,
    pub webhook_url: String,
}

/// A validated status-patch request.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPatch {
    pub vault_id: String,
    pub message_id: String,
    pub embeds: Vec<Value>,
}

/// A validated session registration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRegistration {
    pub session_id: String,
    /// Real Discord webhook URL or a vault identifier
    pub webhook: String,
    pub message_id: String,
    pub channel_id: Option<String>,
    pub embed: Value,
}

/// Relay request validator.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    max_payload_bytes: usize,
}

impl RequestValidator {
    /// Create a new validator with the given payload limit.
    pub fn new(max_payload_bytes: usize) -> Self {
        Self { max_payload_bytes }
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Whether a serialized payload of `len` bytes is within the limit.
    pub fn payload_fits(&self, len: usize) -> bool {
        len <= self.max_payload_bytes
    }

    /// Require a non-blank webhook identifier.
    pub fn validate_identifier<'a>(&self, identifier: Option<&'a str>) -> Result<&'a str, ValidationError> {
        match identifier.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => {
                debug!("Missing webhook identifier");
                Err(ValidationError::MissingIdentifier)
            }
        }
    }

    /// Check that `raw` is a genuine Discord webhook URL.
    pub fn validate_webhook_url(&self, raw: &str) -> Result<Url, ValidationError> {
        let url = Url::parse(raw.trim()).map_err(|_| {
            debug!("Unparseable webhook URL");
            ValidationError::InvalidUrl
        })?;

        if url.scheme() != "https" {
            debug!(scheme = %url.scheme(), "Webhook URL is not https");
            return Err(ValidationError::NotDiscordWebhook);
        }

        let host_ok = url.host_str().is_some_and(is_discord_host);
        if !host_ok || !url.path().contains(WEBHOOK_PATH) {
            debug!(host = ?url.host_str(), "Webhook URL is not a Discord webhook");
            return Err(ValidationError::NotDiscordWebhook);
        }

        Ok(url)
    }

    /// Validate a `/register-webhook` body.
    pub fn validate_registration(&self, body: &Value) -> Result<Registration, ValidationError> {
        let owner_id = body.get("owner_discord_id").and_then(scalar_string);
        let webhook_url = body
            .get("webhook_url")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty());

        let (Some(owner_id), Some(webhook_url)) = (owner_id, webhook_url) else {
            return Err(ValidationError::MissingRegistrationFields);
        };

        let url = self.validate_webhook_url(webhook_url)?;
        Ok(Registration {
            owner_id,
            webhook_url: url.to_string(),
        })
    }

    /// Validate a `/status-patch` body. Accepts snake_case and camelCase keys.
    pub fn validate_status_patch(&self, body: &Value) -> Result<StatusPatch, ValidationError> {
        let vault_id = either(body, "vault_id", "vaultId").and_then(scalar_string);
        let message_id = either(body, "message_id", "messageId").and_then(scalar_string);
        let embeds = body.get("embeds").and_then(Value::as_array);

        match (vault_id, message_id, embeds) {
            (Some(vault_id), Some(message_id), Some(embeds)) => Ok(StatusPatch {
                vault_id,
                message_id,
                embeds: embeds.clone(),
            }),
            _ => Err(ValidationError::MissingPatchFields),
        }
    }

    /// Validate a session registration body.
    pub fn validate_session(&self, body: &Value) -> Result<SessionRegistration, ValidationError> {
        let session_id = either(body, "session_id", "sessionId").and_then(scalar_string);
        let webhook = body.get("webhook").and_then(scalar_string);
        let message_id = either(body, "message_id", "messageId").and_then(scalar_string);
        let channel_id = either(body, "channel_id", "channelId").and_then(scalar_string);
        let embed = body.get("embed").filter(|e| e.is_object());

        let (Some(session_id), Some(webhook), Some(message_id), Some(embed)) =
            (session_id, webhook, message_id, embed)
        else {
            return Err(ValidationError::MissingSessionFields);
        };

        // A full URL must be a Discord webhook; anything else is a vault id.
        if webhook.contains("://") {
            self.validate_webhook_url(&webhook)?;
        }

        Ok(SessionRegistration {
            session_id,
            webhook,
            message_id,
            channel_id,
            embed: embed.clone(),
        })
    }
}

/// Whether `raw` parses as a Discord webhook URL.
pub fn is_discord_webhook_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| {
        url.scheme() == "https"
            && url.host_str().is_some_and(is_discord_host)
            && url.path().contains(WEBHOOK_PATH)
    })
}

fn is_discord_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    DISCORD_HOSTS.iter().any(|allowed| {
        host == *allowed
            || host
                .strip_suffix(allowed)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

fn either<'a>(body: &'a Value, snake: &str, camel: &str) -> Option<&'a Value> {
    body.get(snake)
        .filter(|v| !v.is_null())
        .or_else(|| body.get(camel))
}

/// Non-empty string or number rendered as a string.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
