//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Live chat connections
//! - Chat fan-out outcomes (delivered broadcasts, persistence failures,
//!   slow-consumer evictions)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace("forum_chat"),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace("forum_chat")
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Connections currently registered with the chat hub
pub static CHAT_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "chat_connections_active",
            "Number of connections registered with the chat hub",
        )
        .namespace("forum_chat"),
    )
    .expect("Failed to create CHAT_CONNECTIONS_ACTIVE metric")
});

/// Broadcasts persisted and fanned out
pub static CHAT_BROADCASTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "chat_broadcasts_total",
            "Chat messages persisted and fanned out",
        )
        .namespace("forum_chat"),
    )
    .expect("Failed to create CHAT_BROADCASTS_TOTAL metric")
});

/// Broadcasts dropped because persistence failed
pub static CHAT_PERSIST_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "chat_persist_failures_total",
            "Chat messages dropped because they could not be persisted",
        )
        .namespace("forum_chat"),
    )
    .expect("Failed to create CHAT_PERSIST_FAILURES_TOTAL metric")
});

/// Connections evicted because their mailbox was full
pub static CHAT_SLOW_CONSUMERS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "chat_slow_consumers_total",
            "Connections disconnected because their outbound mailbox was full",
        )
        .namespace("forum_chat"),
    )
    .expect("Failed to create CHAT_SLOW_CONSUMERS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(CHAT_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register CHAT_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(CHAT_BROADCASTS_TOTAL.clone()))
        .expect("Failed to register CHAT_BROADCASTS_TOTAL");
    registry
        .register(Box::new(CHAT_PERSIST_FAILURES_TOTAL.clone()))
        .expect("Failed to register CHAT_PERSIST_FAILURES_TOTAL");
    registry
        .register(Box::new(CHAT_SLOW_CONSUMERS_TOTAL.clone()))
        .expect("Failed to register CHAT_SLOW_CONSUMERS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to publish the hub's membership size
pub fn set_chat_connections(count: usize) {
    CHAT_CONNECTIONS_ACTIVE.set(count as i64);
}
