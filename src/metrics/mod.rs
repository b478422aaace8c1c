//! Prometheus metrics for lifecycle operations and agent traffic.
//!
//! Metrics register themselves in the default prometheus registry on first
//! use; [`gather`] renders them in the text exposition format.

use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramOpts, HistogramVec,
    IntCounterVec, TextEncoder,
};

const DEFAULT_BUCKETS: &[f64] = &[
    1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 30000.0,
];

// Lifecycle operations by outcome
static OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "router_manager_operations_total",
        "Router lifecycle operations handled by the orchestrator",
        &["operation", "outcome"]
    )
    .expect("Failed to register prometheus metric: router_manager_operations_total")
});

// Agent commands by outcome
static AGENT_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "router_manager_agent_requests_total",
        "Control commands sent to router agents",
        &["command", "outcome"]
    )
    .expect("Failed to register prometheus metric: router_manager_agent_requests_total")
});

static AGENT_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    let opts = HistogramOpts::new(
        "router_manager_agent_request_duration_ms",
        "Agent command latency in milliseconds",
    )
    .buckets(DEFAULT_BUCKETS.to_vec());
    register_histogram_vec!(opts, &["command"])
        .expect("Failed to register prometheus metric: router_manager_agent_request_duration_ms")
});

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

pub fn observe_operation(operation: &str, ok: bool) {
    OPERATIONS
        .with_label_values(&[operation, outcome(ok)])
        .inc();
}

pub fn observe_agent_request(command: &str, ok: bool, elapsed: Duration) {
    AGENT_REQUESTS
        .with_label_values(&[command, outcome(ok)])
        .inc();
    AGENT_LATENCY
        .with_label_values(&[command])
        .observe(elapsed.as_secs_f64() * 1000.0);
}

/// Render every registered metric in the prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        log::error!("Failed to encode prometheus metrics: {e}");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
