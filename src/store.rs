// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Encrypted webhook record storage.
//!
//! Records live in a `webhooks` table behind a PostgREST (Supabase) API:
//!
//! - `GET  /rest/v1/webhooks?id=eq.{id}&select=webhook_enc`
//! - `POST /rest/v1/webhooks` with `{id, owner_discord_id, webhook_enc}`
//!
//! Both calls authenticate with the service-role key in `apikey` and
//! `Authorization: Bearer`.

use crate::error::UpstreamError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// A registered webhook. `webhook_enc` is a sealed blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub id: String,
    pub owner_discord_id: String,
    pub webhook_enc: String,
}

#[derive(Debug, Deserialize)]
struct SealedRow {
    webhook_enc: String,
}

/// Storage for encrypted webhook records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Sealed URL for `identifier`, or `None` when no record exists.
    async fn fetch_sealed(&self, identifier: &str) -> Result<Option<String>, UpstreamError>;

    /// Persist a new record.
    async fn insert(&self, record: &EncryptedRecord) -> Result<(), UpstreamError>;
}

/// PostgREST-backed record store.
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, service_key))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/webhooks", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", self.service_key.as_str())
            .bearer_auth(&self.service_key)
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn fetch_sealed(&self, identifier: &str) -> Result<Option<String>, UpstreamError> {
        let response = self
            .authorized(self.client.get(self.table_url()))
            .query(&[("id", format!("eq.{}", identifier)), ("select", "webhook_enc".to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<SealedRow> = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.without_url().to_string()))?;
        debug!(%identifier, rows = rows.len(), "Record store lookup");

        Ok(rows.into_iter().next().map(|row| row.webhook_enc))
    }

    async fn insert(&self, record: &EncryptedRecord) -> Result<(), UpstreamError> {
        let response = self
            .authorized(self.client.post(self.table_url()))
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(id = %record.id, "Record stored");
        Ok(())
    }
}

/// Process-local record store for development and tests.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, EncryptedRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn get(&self, identifier: &str) -> Option<EncryptedRecord> {
        self.records.read().await.get(identifier).cloned()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn fetch_sealed(&self, identifier: &str) -> Result<Option<String>, UpstreamError> {
        Ok(self
            .records
            .read()
            .await
            .get(identifier)
            .map(|r| r.webhook_enc.clone()))
    }

    async fn insert(&self, record: &EncryptedRecord) -> Result<(), UpstreamError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(UpstreamError::Status {
                status: 409,
                body: format!("duplicate id {}", record.id),
            });
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }
}
