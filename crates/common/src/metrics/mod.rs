//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Siga o Dinheiro metrics
pub const METRICS_PREFIX: &str = "siga";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 25ms, P99 < 100ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms - P50 target
    0.050, // 50ms
    0.100, // 100ms - P99 target
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Article metrics
    describe_counter!(
        format!("{}_article_mutations_total", METRICS_PREFIX),
        Unit::Count,
        "Article create/update/delete operations by outcome"
    );

    describe_gauge!(
        format!("{}_articles_listed", METRICS_PREFIX),
        Unit::Count,
        "Number of articles returned by the last listing"
    );

    // Auth metrics
    describe_counter!(
        format!("{}_admin_logins_total", METRICS_PREFIX),
        Unit::Count,
        "Admin login attempts by outcome"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record an article mutation
pub fn record_article_mutation(operation: &'static str, outcome: &'static str) {
    counter!(
        format!("{}_article_mutations_total", METRICS_PREFIX),
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Helper to record listing size
pub fn record_listing(count: usize) {
    gauge!(format!("{}_articles_listed", METRICS_PREFIX)).set(count as f64);
}

/// Helper to record an admin login attempt
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "rejected" };

    counter!(
        format!("{}_admin_logins_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}
