// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for admission, forwarding and session liveness.

use crate::heartbeat::SweepReport;
use crate::limiter::AdmissionResult;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Registered relay metrics.
pub struct RelayMetrics {
    registry: Registry,
    admissions: IntCounterVec,
    forwards: IntCounterVec,
    active_sessions: IntGauge,
    disconnect_edits: IntCounterVec,
}

impl RelayMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let admissions = IntCounterVec::new(
            Opts::new("relay_admissions_total", "Admission decisions by outcome"),
            &["outcome"],
        )?;
        let forwards = IntCounterVec::new(
            Opts::new("relay_forwards_total", "Discord responses by status class"),
            &["status_class"],
        )?;
        let active_sessions = IntGauge::new("relay_active_sessions", "Sessions currently tracked")?;
        let disconnect_edits = IntCounterVec::new(
            Opts::new("relay_disconnect_edits_total", "Disconnect edits by result"),
            &["result"],
        )?;

        registry.register(Box::new(admissions.clone()))?;
        registry.register(Box::new(forwards.clone()))?;
        registry.register(Box::new(active_sessions.clone()))?;
        registry.register(Box::new(disconnect_edits.clone()))?;

        Ok(Self {
            registry,
            admissions,
            forwards,
            active_sessions,
            disconnect_edits,
        })
    }

    pub fn record_admission(&self, result: &AdmissionResult) {
        let outcome = result.reason().map(|r| r.code()).unwrap_or("allowed");
        self.admissions.with_label_values(&[outcome]).inc();
    }

    pub fn record_forward(&self, status: u16) {
        let class = match status {
            200..=299 => "2xx",
            400..=499 => "4xx",
            500..=599 => "5xx",
            _ => "other",
        };
        self.forwards.with_label_values(&[class]).inc();
    }

    pub fn set_active_sessions(&self, count: usize) {
        self.active_sessions.set(count as i64);
    }

    pub fn record_sweep(&self, report: &SweepReport) {
        self.disconnect_edits
            .with_label_values(&["ok"])
            .inc_by(report.edited as u64);
        self.disconnect_edits
            .with_label_values(&["failed"])
            .inc_by(report.failed as u64);
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
