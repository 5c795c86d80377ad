// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission pipeline for forwarded webhook calls.
//!
//! Four sliding-window rules gate every `/hit` request:
//! 1. Per-IP volume
//! 2. Per-webhook-identifier volume
//! 3. Broadcast mentions (`@everyone`/`@here`) per IP
//! 4. Identical normalized text per IP
//!
//! Each rule records the attempt before comparing against its limits, so
//! rejected attempts keep counting. All four rules record on every call;
//! the first rejecting rule, in the order above, decides the reason.

use crate::config::{RateLimitConfig, WindowLimit};
use crate::payload::{contains_broadcast_mention, fingerprint, normalize_text, MessagePayload};
use crate::window::{first_exceeded, SlidingWindow, Timestamp};
use tracing::{debug, warn};

/// Result of an admission check.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionResult {
    /// Request may be forwarded
    Allowed,
    /// Request is rejected
    Limited {
        /// Rule that rejected
        reason: RejectReason,
        /// Window limit that was exceeded
        limit: WindowLimit,
    },
}

impl AdmissionResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionResult::Allowed)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            AdmissionResult::Allowed => None,
            AdmissionResult::Limited { reason, .. } => Some(*reason),
        }
    }
}

/// Reason for rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Client IP exceeded its volume limits
    IpRateExceeded,
    /// Webhook identifier exceeded its volume limits
    WebhookRateExceeded,
    /// Too many broadcast mentions from one IP
    MentionSpam,
    /// Same text repeated too often from one IP
    DuplicateContent,
}

impl RejectReason {
    /// Stable machine-readable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IpRateExceeded => "ip_rate_limit",
            Self::WebhookRateExceeded => "webhook_rate_limit",
            Self::MentionSpam => "mention_spam",
            Self::DuplicateContent => "duplicate_content",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IpRateExceeded => write!(f, "IP rate limit exceeded"),
            Self::WebhookRateExceeded => write!(f, "Webhook rate limit exceeded"),
            Self::MentionSpam => write!(f, "Too many @everyone/@here mentions"),
            Self::DuplicateContent => write!(f, "Duplicate message spam detected"),
        }
    }
}

/// In-memory admission state, constructed once per process.
pub struct AdmissionPipeline {
    config: RateLimitConfig,
    by_ip: SlidingWindow<String>,
    by_webhook: SlidingWindow<String>,
    mentions_by_ip: SlidingWindow<String>,
    /// Keyed by (ip, fingerprint of normalized text)
    duplicates_by_ip: SlidingWindow<(String, String)>,
}

impl AdmissionPipeline {
    /// Create a pipeline with the given thresholds.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            by_ip: SlidingWindow::for_limits(&config.ip),
            by_webhook: SlidingWindow::for_limits(&config.webhook),
            mentions_by_ip: SlidingWindow::for_limits(&config.mention),
            duplicates_by_ip: SlidingWindow::for_limits(&config.duplicate),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Rule 1: per-IP volume.
    pub async fn check_ip(&self, ip: &str, now: Timestamp) -> Option<WindowLimit> {
        let log = self.by_ip.record(ip.to_string(), now).await;
        let exceeded = first_exceeded(&log, now, &self.config.ip);
        if let Some(limit) = exceeded {
            debug!(%ip, window_secs = limit.window_secs, max = limit.max, "IP volume exceeded");
        }
        exceeded
    }

    /// Rule 2: per-webhook-identifier volume.
    pub async fn check_webhook(&self, identifier: &str, now: Timestamp) -> Option<WindowLimit> {
        let log = self.by_webhook.record(identifier.to_string(), now).await;
        let exceeded = first_exceeded(&log, now, &self.config.webhook);
        if let Some(limit) = exceeded {
            debug!(%identifier, window_secs = limit.window_secs, max = limit.max, "Webhook volume exceeded");
        }
        exceeded
    }

    /// Rule 3: broadcast mentions per IP. Text without a mention is not
    /// recorded.
    pub async fn check_mentions(&self, ip: &str, text: &str, now: Timestamp) -> Option<WindowLimit> {
        if !contains_broadcast_mention(text, &self.config.broadcast_tokens) {
            return None;
        }
        let log = self.mentions_by_ip.record(ip.to_string(), now).await;
        let exceeded = first_exceeded(&log, now, &self.config.mention);
        if let Some(limit) = exceeded {
            warn!(%ip, window_secs = limit.window_secs, count = log.len(), "Broadcast mention spam");
        }
        exceeded
    }

    /// Rule 4: identical normalized text per IP. Empty text is not
    /// recorded.
    pub async fn check_duplicate(&self, ip: &str, text: &str, now: Timestamp) -> Option<WindowLimit> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return None;
        }
        let key = (ip.to_string(), fingerprint(&normalized));
        let log = self.duplicates_by_ip.record(key, now).await;
        let exceeded = first_exceeded(&log, now, &self.config.duplicate);
        if let Some(limit) = exceeded {
            warn!(%ip, window_secs = limit.window_secs, count = log.len(), "Duplicate content spam");
        }
        exceeded
    }

    /// Run all four rules for one request.
    pub async fn admit(
        &self,
        ip: &str,
        identifier: &str,
        payload: &MessagePayload,
        now: Timestamp,
    ) -> AdmissionResult {
        let text = payload.extract_text();

        let results = [
            (RejectReason::IpRateExceeded, self.check_ip(ip, now).await),
            (RejectReason::WebhookRateExceeded, self.check_webhook(identifier, now).await),
            (RejectReason::MentionSpam, self.check_mentions(ip, &text, now).await),
            (RejectReason::DuplicateContent, self.check_duplicate(ip, &text, now).await),
        ];

        match results
            .into_iter()
            .find_map(|(reason, exceeded)| exceeded.map(|limit| (reason, limit)))
        {
            Some((reason, limit)) => AdmissionResult::Limited { reason, limit },
            None => AdmissionResult::Allowed,
        }
    }

    /// Drop keys whose history has aged out (should be called periodically).
    pub async fn cleanup(&self, now: Timestamp) -> usize {
        let removed = self.by_ip.cleanup(now).await
            + self.by_webhook.cleanup(now).await
            + self.mentions_by_ip.cleanup(now).await
            + self.duplicates_by_ip.cleanup(now).await;
        if removed > 0 {
            debug!(removed, "Dropped idle admission keys");
        }
        removed
    }

    /// Number of keys currently tracked across all rules.
    pub async fn tracked_keys(&self) -> usize {
        self.by_ip.key_count().await
            + self.by_webhook.key_count().await
            + self.mentions_by_ip.key_count().await
            + self.duplicates_by_ip.key_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> MessagePayload {
        MessagePayload {
            content: Some(content.to_string()),
            embeds: None,
        }
    }

    fn pipeline() -> AdmissionPipeline {
        AdmissionPipeline::new(RateLimitConfig::default())
    }

    #[tokio::test]
    async fn test_sixth_call_in_one_second_is_limited() {
        let pipeline = pipeline();

        for i in 0..5 {
            let result = pipeline
                .admit("10.0.0.1", "wh_a", &text(&format!("msg {}", i)), 100.0 + i as f64 * 0.1)
                .await;
            assert!(result.is_allowed(), "call {} should be allowed", i + 1);
        }

        let result = pipeline.admit("10.0.0.1", "wh_a", &text("msg 5"), 100.5).await;
        assert_eq!(
            result,
            AdmissionResult::Limited {
                reason: RejectReason::IpRateExceeded,
                limit: WindowLimit::new(1, 5),
            }
        );
    }

    #[tokio::test]
    async fn test_spaced_calls_pass_one_second_rule() {
        let pipeline = pipeline();
        for i in 0..20 {
            let result = pipeline
                .admit("10.0.0.2", "wh_a", &text(&format!("update {}", i)), 1000.0 + i as f64 * 1.5)
                .await;
            assert!(result.is_allowed(), "call {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn test_rejected_attempts_still_count() {
        let pipeline = pipeline();
        for i in 0..10 {
            pipeline.admit("10.0.0.3", "wh_a", &text(&format!("m{}", i)), 50.0).await;
        }
        // Ten attempts in the same second all recorded, not just the first five.
        assert_eq!(pipeline.by_ip.snapshot(&"10.0.0.3".to_string()).await.len(), 10);
    }

    #[tokio::test]
    async fn test_webhook_volume_across_ips() {
        let pipeline = pipeline();
        for i in 0..120 {
            let ip = format!("10.1.{}.{}", i / 200, i % 200);
            let result = pipeline.admit(&ip, "wh_busy", &text(&format!("n{}", i)), 10.0 + i as f64 * 0.2).await;
            assert!(result.is_allowed(), "call {} should be allowed", i + 1);
        }
        let result = pipeline.admit("10.9.9.9", "wh_busy", &text("last"), 34.5).await;
        assert_eq!(result.reason(), Some(RejectReason::WebhookRateExceeded));
    }

    #[tokio::test]
    async fn test_duplicate_text_fourth_is_limited() {
        let pipeline = pipeline();
        for i in 0..3 {
            let result = pipeline.admit("10.0.0.4", "wh_a", &text("Free Nitro"), 10.0 + i as f64 * 5.0).await;
            assert!(result.is_allowed());
        }
        let result = pipeline.admit("10.0.0.4", "wh_a", &text("  free nitro "), 30.0).await;
        assert_eq!(result.reason(), Some(RejectReason::DuplicateContent));
    }

    #[tokio::test]
    async fn test_duplicate_text_does_not_cross_ips() {
        let pipeline = pipeline();
        for i in 0..6 {
            let ip = if i % 2 == 0 { "10.0.0.5" } else { "10.0.0.6" };
            let result = pipeline.admit(ip, "wh_a", &text("same words"), 10.0 + i as f64 * 2.0).await;
            assert!(result.is_allowed(), "call {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn test_distinct_texts_tracked_separately() {
        let pipeline = pipeline();
        for i in 0..3 {
            let now = 10.0 + i as f64 * 2.0;
            assert!(pipeline.admit("10.0.0.7", "wh_a", &text("alpha"), now).await.is_allowed());
            assert!(pipeline.admit("10.0.0.7", "wh_a", &text("beta"), now + 1.0).await.is_allowed());
        }
    }

    #[tokio::test]
    async fn test_mentions_count_case_insensitively() {
        let pipeline = pipeline();
        let variants = ["Hello @EVERYONE", "hello @everyone", "ping @Everyone now"];
        for (i, content) in variants.iter().enumerate() {
            let result = pipeline.admit("10.0.0.8", "wh_a", &text(content), 10.0 + i as f64 * 2.0).await;
            assert!(result.is_allowed());
        }
        let result = pipeline.admit("10.0.0.8", "wh_a", &text("@everyone again"), 20.0).await;
        assert_eq!(result.reason(), Some(RejectReason::MentionSpam));
    }

    #[tokio::test]
    async fn test_mentions_daily_limit() {
        let pipeline = pipeline();
        for i in 0..20 {
            let content = format!("@here update {}", i);
            let result = pipeline.admit("10.0.0.9", "wh_a", &text(&content), i as f64 * 120.0).await;
            assert!(result.is_allowed(), "call {} should be allowed", i + 1);
        }
        let result = pipeline.admit("10.0.0.9", "wh_a", &text("@here final"), 20.0 * 120.0).await;
        assert_eq!(
            result,
            AdmissionResult::Limited {
                reason: RejectReason::MentionSpam,
                limit: WindowLimit::new(86400, 20),
            }
        );
    }

    #[tokio::test]
    async fn test_embed_text_is_checked() {
        let pipeline = pipeline();
        let payload = MessagePayload::from_value(&serde_json::json!({
            "embeds": [{"fields": [{"name": "Alert", "value": "@everyone look"}]}]
        }));
        for i in 0..4 {
            pipeline.admit("10.0.0.10", "wh_a", &payload, 10.0 + i as f64 * 2.0).await;
        }
        let log = pipeline.mentions_by_ip.snapshot(&"10.0.0.10".to_string()).await;
        assert_eq!(log.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_text_skips_content_rules() {
        let pipeline = pipeline();
        for i in 0..10 {
            let result = pipeline.admit("10.0.0.11", "wh_a", &MessagePayload::default(), i as f64 * 2.0).await;
            assert!(result.is_allowed());
        }
        assert_eq!(pipeline.duplicates_by_ip.key_count().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_releases_idle_keys() {
        let pipeline = pipeline();
        pipeline.admit("10.0.0.12", "wh_a", &text("hi"), 0.0).await;
        assert_eq!(pipeline.tracked_keys().await, 3);

        // IP and webhook history expires after an hour, content history after a day.
        assert_eq!(pipeline.cleanup(3600.0).await, 2);
        assert_eq!(pipeline.cleanup(86400.0).await, 1);
        assert_eq!(pipeline.tracked_keys().await, 0);
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(RejectReason::IpRateExceeded.code(), "ip_rate_limit");
        assert_eq!(RejectReason::WebhookRateExceeded.to_string(), "Webhook rate limit exceeded");
    }
}
