// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for spam simulation.

use discord_webhook_relay::payload::{Embed, EmbedField, MessagePayload};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of client IPs for testing.
pub fn generate_ips(count: usize) -> Vec<String> {
    (0..count.max(1))
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c)).to_string()
        })
        .collect()
}

/// Generate a pool of webhook identifiers.
pub fn generate_identifiers(count: usize) -> Vec<String> {
    (0..count.max(1)).map(|i| format!("wh_{:018x}", i)).collect()
}

/// Generate distinct messages, alternating plain content and embeds.
pub fn generate_messages(count: usize, with_mentions: bool) -> Vec<MessagePayload> {
    (0..count.max(1))
        .map(|i| {
            let text = if with_mentions {
                format!("@everyone server restart #{}", i)
            } else {
                format!("player count is now {}", i)
            };
            if i % 2 == 0 {
                MessagePayload {
                    content: Some(text),
                    embeds: None,
                }
            } else {
                MessagePayload {
                    content: None,
                    embeds: Some(vec![Embed {
                        title: Some("Status".to_string()),
                        description: None,
                        fields: Some(vec![EmbedField {
                            name: "Update".to_string(),
                            value: text,
                            inline: None,
                        }]),
                    }]),
                }
            }
        })
        .collect()
}

/// Case and spacing variants of one spam text; all normalize identically.
pub fn generate_duplicate_variants() -> Vec<&'static str> {
    vec![
        "FREE NITRO at example.gg",
        "free nitro at example.gg",
        "  Free Nitro at example.gg  ",
        "free nitro AT EXAMPLE.GG\n",
    ]
}

/// Broadcast mention spellings that must all be caught.
pub fn generate_mention_variants() -> Vec<&'static str> {
    vec!["@everyone", "@EVERYONE", "@Everyone hi", "hey @here", "@HERE!"]
}
