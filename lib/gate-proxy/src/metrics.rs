//! Prometheus metrics for gate decisions

use anyhow::Result;
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus counters for admit/reject decisions.
pub struct GateMetrics {
    /// Requests admitted, labeled by mode (`check_disabled`, `validated`).
    pub requests_admitted_total: CounterVec,
    /// Requests rejected, labeled by reason (`no_certificate`,
    /// `identity_mismatch`, `validation_error`).
    pub requests_rejected_total: CounterVec,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl GateMetrics {
    /// Create a new metrics collector with its own registry.
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let requests_admitted_total = CounterVec::new(
            Opts::new(
                "gate_requests_admitted_total",
                "Requests admitted by the client certificate gate",
            ),
            &["mode"],
        )?;

        let requests_rejected_total = CounterVec::new(
            Opts::new(
                "gate_requests_rejected_total",
                "Requests rejected by the client certificate gate",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(requests_admitted_total.clone()))?;
        registry.register(Box::new(requests_rejected_total.clone()))?;

        Ok(Self {
            requests_admitted_total,
            requests_rejected_total,
            registry,
        })
    }

    /// Record an admitted request.
    pub fn record_admitted(&self, mode: &str) {
        self.requests_admitted_total
            .with_label_values(&[mode])
            .inc();
    }

    /// Record a rejected request.
    pub fn record_rejected(&self, reason: &str) {
        self.requests_rejected_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Gather all metrics in Prometheus text format.
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Clone for GateMetrics {
    fn clone(&self) -> Self {
        // Clones share the same registry and counters
        Self {
            requests_admitted_total: self.requests_admitted_total.clone(),
            requests_rejected_total: self.requests_rejected_total.clone(),
            registry: self.registry.clone(),
        }
    }
}
