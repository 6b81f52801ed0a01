//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{COMPOSITIONS_TOTAL, DISPATCHES_TOTAL, DISPATCH_LATENCY, OBSERVER_NOTIFICATIONS_TOTAL};
use crate::message::DeliveryOutcome;

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording composition metrics
pub struct CompositionMetrics;

impl CompositionMetrics {
    /// Record a message composed from a catalog template
    pub fn record_resolved() {
        COMPOSITIONS_TOTAL.with_label_values(&["resolved"]).inc();
    }

    /// Record a message composed without a template
    pub fn record_degraded() {
        COMPOSITIONS_TOTAL.with_label_values(&["degraded"]).inc();
    }
}

/// Helper struct for recording delivery metrics
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    /// Record one delivery attempt.
    ///
    /// Each observer receives two notifications per attempt.
    pub fn record(outcome: &DeliveryOutcome, elapsed: Duration, observers: usize) {
        DISPATCHES_TOTAL.with_label_values(&[outcome.label()]).inc();
        DISPATCH_LATENCY.observe(elapsed.as_secs_f64());
        OBSERVER_NOTIFICATIONS_TOTAL.inc_by(observers as u64 * 2);
    }
}
