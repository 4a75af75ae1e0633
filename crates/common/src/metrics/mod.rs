//! Metrics and observability utilities
//!
//! Describes the ExamVault metrics and provides small helpers so call sites
//! record them with consistent names and labels. Recording is a no-op until
//! the host installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all ExamVault metrics
pub const METRICS_PREFIX: &str = "examvault";

/// Histogram buckets for remote store latency (in seconds).
/// Spreadsheet-backed stores are slow; most calls land between 300ms and 3s.
pub const GATEWAY_BUCKETS: &[f64] = &[
    0.050,
    0.100,
    0.250,
    0.500,
    1.000,
    2.000,
    3.000,
    5.000,
    10.00,
    15.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_gateway_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total remote store requests by action and outcome"
    );

    describe_histogram!(
        format!("{}_gateway_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Remote store request latency in seconds"
    );

    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total client cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total client cache misses"
    );

    describe_counter!(
        format!("{}_mutations_total", METRICS_PREFIX),
        Unit::Count,
        "Total confirmed or rejected mutations by kind"
    );

    tracing::debug!("Metrics registered");
}

/// Helper to time one gateway call
pub struct GatewayCall {
    start: Instant,
    action: &'static str,
}

impl GatewayCall {
    /// Start tracking a call
    pub fn start(action: &'static str) -> Self {
        Self {
            start: Instant::now(),
            action,
        }
    }

    /// Record completion; `outcome` is "success", "network" or "rejected"
    pub fn finish(self, outcome: &'static str) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_gateway_requests_total", METRICS_PREFIX),
            "action" => self.action,
            "outcome" => outcome
        )
        .increment(1);

        histogram!(
            format!("{}_gateway_duration_seconds", METRICS_PREFIX),
            "action" => self.action
        )
        .record(duration);
    }
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, scope: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "scope" => scope.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "scope" => scope.to_string()
        )
        .increment(1);
    }
}

/// Helper to record mutation metrics
pub fn record_mutation(kind: &'static str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_mutations_total", METRICS_PREFIX),
        "kind" => kind,
        "status" => status
    )
    .increment(1);
}
