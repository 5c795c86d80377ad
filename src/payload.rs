// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Discord message payloads and text extraction.
//!
//! Only the human-readable parts matter for admission; every other key of
//! the client's JSON is forwarded untouched and never parsed here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Field value written into the "Status" field of a disconnected embed.
pub const DISCONNECTED_STATUS: &str = "🔴 Disconnected";

/// Name of the embed field that carries session status.
pub const STATUS_FIELD_NAME: &str = "Status";

/// The text-bearing shape of a Discord webhook message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<EmbedField>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

impl MessagePayload {
    /// Read the text-bearing parts of an arbitrary JSON body.
    ///
    /// Malformed parts are dropped individually, so one embed with a
    /// non-string title does not hide the text of the others.
    pub fn from_value(value: &Value) -> Self {
        let content = value.get("content").and_then(Value::as_str).map(str::to_string);
        let embeds = value.get("embeds").and_then(Value::as_array).map(|embeds| {
            embeds
                .iter()
                .filter(|e| e.is_object())
                .map(Embed::from_value)
                .collect()
        });
        Self { content, embeds }
    }

    /// All human-readable text, newline separated: content, then each
    /// embed's title, description and field names/values.
    pub fn extract_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(content) = &self.content {
            parts.push(content);
        }
        for embed in self.embeds.iter().flatten() {
            parts.extend(embed.title.as_deref());
            parts.extend(embed.description.as_deref());
            for field in embed.fields.iter().flatten() {
                parts.push(&field.name);
                parts.push(&field.value);
            }
        }
        parts.retain(|p| !p.is_empty());
        parts.join("\n")
    }
}

impl Embed {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let fields = value.get("fields").and_then(Value::as_array).map(|fields| {
            fields
                .iter()
                .filter(|f| f.is_object())
                .map(|f| EmbedField {
                    name: f.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    value: f.get("value").and_then(Value::as_str).unwrap_or_default().to_string(),
                    inline: f.get("inline").and_then(Value::as_bool),
                })
                .collect()
        });
        Self {
            title: text("title"),
            description: text("description"),
            fields,
        }
    }
}

/// Trimmed, lowercased text used for duplicate detection.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Stable fingerprint of normalized text, so counters do not hold message
/// bodies.
pub fn fingerprint(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Whether `text` contains any broadcast token, ignoring case.
pub fn contains_broadcast_mention(text: &str, tokens: &[String]) -> bool {
    let lowered = text.to_lowercase();
    tokens
        .iter()
        .any(|token| !token.is_empty() && lowered.contains(&token.to_lowercase()))
}

/// Copy of an embed template with its "Status" field set to disconnected.
///
/// An existing field named "Status" (any case) is overwritten in place;
/// otherwise an inline field is appended. Non-object templates are replaced
/// by an embed holding just the status field.
pub fn mark_disconnected(template: &Value) -> Value {
    let mut embed = match template {
        Value::Object(map) => Value::Object(map.clone()),
        _ => Value::Object(serde_json::Map::new()),
    };

    let status = serde_json::json!({
        "name": STATUS_FIELD_NAME,
        "value": DISCONNECTED_STATUS,
        "inline": true,
    });

    if let Some(map) = embed.as_object_mut() {
        let fields = map
            .entry("fields")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !fields.is_array() {
            *fields = Value::Array(Vec::new());
        }
        if let Some(fields) = fields.as_array_mut() {
            let existing = fields.iter_mut().find(|f| {
                f.get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.eq_ignore_ascii_case(STATUS_FIELD_NAME))
            });
            match existing {
                Some(field) => {
                    if let Some(obj) = field.as_object_mut() {
                        obj.insert("value".to_string(), Value::String(DISCONNECTED_STATUS.to_string()));
                    }
                }
                None => fields.push(status),
            }
        }
    }

    embed
}
