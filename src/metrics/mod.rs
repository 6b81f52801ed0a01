//! Prometheus metrics for composition and delivery.
//!
//! - Composition results (template resolved vs. degraded)
//! - Delivery outcomes (sent, failed) and latency
//! - Observer notifications

mod helpers;

pub use helpers::{encode_metrics, CompositionMetrics, DeliveryMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "mailer";

lazy_static! {
    /// Messages composed, by template resolution result
    pub static ref COMPOSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_compositions_total", METRIC_PREFIX),
        "Total messages composed by template resolution result",
        &["result"]
    ).unwrap();

    /// Delivery attempts, by outcome
    pub static ref DISPATCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatches_total", METRIC_PREFIX),
        "Total dispatches by outcome",
        &["outcome"]
    ).unwrap();

    /// Transport round-trip time
    pub static ref DISPATCH_LATENCY: Histogram = register_histogram!(
        format!("{}_dispatch_latency_seconds", METRIC_PREFIX),
        "Time spent in the transport per delivery attempt",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    /// Observer callbacks invoked
    pub static ref OBSERVER_NOTIFICATIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_observer_notifications_total", METRIC_PREFIX),
        "Total observer notifications delivered"
    ).unwrap();
}
