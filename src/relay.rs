// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Relay orchestration: resolve a public identifier to the real webhook URL
//! and forward to Discord.
//!
//! Decrypted URLs only ever live on the stack of a single call; nothing
//! here logs or returns them.

use crate::codec::{open, seal, SealingKey};
use crate::discord::{DiscordClient, UpstreamResponse};
use crate::error::{RelayError, Result, UpstreamError};
use crate::payload::mark_disconnected;
use crate::store::{EncryptedRecord, RecordStore};
use crate::validator::{is_discord_webhook_url, Registration};
use rand::RngCore;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefix of public webhook identifiers.
pub const IDENTIFIER_PREFIX: &str = "wh_";

const UNKNOWN_WEBHOOK: &str = "Unknown webhook id";

/// Fresh public identifier: `wh_` + 9 random bytes as hex.
pub fn new_identifier() -> String {
    let mut bytes = [0u8; 9];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{}{}", IDENTIFIER_PREFIX, hex::encode(bytes))
}

/// Resolves identifiers and talks to Discord on behalf of clients.
pub struct Relay {
    store: Arc<dyn RecordStore>,
    discord: Arc<dyn DiscordClient>,
    key: SealingKey,
}

impl Relay {
    pub fn new(store: Arc<dyn RecordStore>, discord: Arc<dyn DiscordClient>, key: SealingKey) -> Self {
        Self { store, discord, key }
    }

    /// Decrypted webhook URL for `identifier`.
    pub async fn resolve(&self, identifier: &str) -> Result<String> {
        let sealed = self
            .store
            .fetch_sealed(identifier)
            .await?
            .ok_or(RelayError::NotFound(UNKNOWN_WEBHOOK))?;
        Ok(open(&sealed, &self.key)?)
    }

    /// Accept either a real Discord webhook URL or an identifier.
    pub async fn resolve_target(&self, webhook_or_identifier: &str) -> Result<String> {
        if is_discord_webhook_url(webhook_or_identifier) {
            Ok(webhook_or_identifier.to_string())
        } else {
            self.resolve(webhook_or_identifier).await
        }
    }

    /// Seal and store a validated webhook, returning its new identifier.
    pub async fn register(&self, registration: &Registration) -> Result<String> {
        let record = EncryptedRecord {
            id: new_identifier(),
            owner_discord_id: registration.owner_id.clone(),
            webhook_enc: seal(&registration.webhook_url, &self.key)?,
        };
        self.store.insert(&record).await?;
        info!(id = %record.id, owner = %record.owner_discord_id, "Webhook registered");
        Ok(record.id)
    }

    /// POST an admitted payload to the identifier's webhook.
    pub async fn forward(&self, identifier: &str, query: Option<&str>, body: &[u8]) -> Result<UpstreamResponse> {
        let webhook_url = self.resolve(identifier).await?;
        let response = self.discord.execute(&webhook_url, query, body).await?;
        debug!(%identifier, status = response.status, "Forwarded to Discord");
        Ok(response)
    }

    /// PATCH a message's embeds through the identifier's webhook.
    pub async fn patch_embeds(&self, identifier: &str, message_id: &str, embeds: Vec<Value>) -> Result<UpstreamResponse> {
        let webhook_url = self.resolve(identifier).await?;
        let response = self
            .discord
            .edit_message(&webhook_url, message_id, &json!({ "embeds": embeds }))
            .await?;
        debug!(%identifier, %message_id, status = response.status, "Patched Discord message");
        Ok(response)
    }

    /// Edit a message so its "Status" field reads disconnected.
    ///
    /// Any failure, including a non-2xx answer from Discord, is an error.
    pub async fn edit_to_disconnected(
        &self,
        webhook_or_identifier: &str,
        message_id: &str,
        embed_template: &Value,
    ) -> Result<UpstreamResponse> {
        let webhook_url = self.resolve_target(webhook_or_identifier).await?;
        let body = json!({ "embeds": [mark_disconnected(embed_template)] });
        let response = self.discord.edit_message(&webhook_url, message_id, &body).await?;

        if !response.is_success() {
            warn!(%message_id, status = response.status, "Disconnect edit rejected by Discord");
            return Err(UpstreamError::Status {
                status: response.status,
                body: response.body,
            }
            .into());
        }
        Ok(response)
    }
}
