// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Spam simulation patterns for security testing.

use std::time::Duration;

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Requests per second (simulated clock)
    pub requests_per_second: f64,
    /// Number of unique client IPs
    pub unique_ips: usize,
    /// Number of unique webhook identifiers
    pub unique_identifiers: usize,
    /// Number of distinct message texts (0 = one per request)
    pub unique_messages: usize,
    /// Whether every message carries a broadcast mention
    pub with_mentions: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 10.0,
            unique_ips: 1,
            unique_identifiers: 1,
            unique_messages: 0,
            with_mentions: false,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single IP flood - one client hammering as fast as it can.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 200,
            requests_per_second: 100.0,
            unique_ips: 1,
            unique_identifiers: 10,
            ..Default::default()
        }
    }

    /// Distributed traffic - many IPs, low rate each.
    pub fn distributed_attack() -> Self {
        Self {
            total_requests: 500,
            requests_per_second: 50.0,
            unique_ips: 100,
            unique_identifiers: 50,
            ..Default::default()
        }
    }

    /// Webhook hammer - every request from a fresh IP, one target webhook.
    pub fn webhook_hammer() -> Self {
        Self {
            total_requests: 300,
            requests_per_second: 10.0,
            unique_ips: 300,
            unique_identifiers: 1,
            ..Default::default()
        }
    }

    /// Mention spam - distinct texts that all ping the whole channel.
    pub fn mention_spam() -> Self {
        Self {
            total_requests: 50,
            requests_per_second: 0.5,
            unique_ips: 1,
            unique_identifiers: 1,
            with_mentions: true,
            ..Default::default()
        }
    }

    /// Duplicate spam - one text repeated slowly enough to pass volume rules.
    pub fn duplicate_spam() -> Self {
        Self {
            total_requests: 50,
            requests_per_second: 0.5,
            unique_ips: 1,
            unique_identifiers: 1,
            unique_messages: 1,
            ..Default::default()
        }
    }

    /// Slow drip - legitimate status updates well under every limit.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 30,
            requests_per_second: 0.1,
            unique_ips: 1,
            unique_identifiers: 1,
            ..Default::default()
        }
    }

    /// Number of distinct messages actually generated.
    pub fn message_pool(&self) -> usize {
        if self.unique_messages == 0 {
            self.total_requests.max(1)
        } else {
            self.unique_messages
        }
    }

    /// Simulated duration of the attack.
    pub fn expected_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_requests as f64 / self.requests_per_second)
    }
}
