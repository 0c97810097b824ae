//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by method, status
//! - `dispatch_request_duration_seconds` (histogram): time from context creation to response
//! - `dispatch_rate_limited_total` (counter): rejections by rule pattern
//! - `dispatch_interceptor_rejections_total` (counter)
//! - `dispatch_sweep_evictions_total` (counter): evictions by kind (session, attribute)
//! - `dispatch_sweep_duration_seconds` (histogram): time the write lock was held
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed recorder it is a no-op
//! - Labels stay low-cardinality: patterns and methods, never raw paths

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::time::Instant;

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, started: Instant) {
    counter!(
        "dispatch_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("dispatch_request_duration_seconds", "method" => method.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_rate_limited(pattern: &str) {
    counter!("dispatch_rate_limited_total", "rule" => pattern.to_string()).increment(1);
}

pub fn record_interceptor_rejection() {
    counter!("dispatch_interceptor_rejections_total").increment(1);
}

pub fn record_sweep(sessions: usize, attributes: usize, held: Duration) {
    counter!("dispatch_sweep_evictions_total", "kind" => "session").increment(sessions as u64);
    counter!("dispatch_sweep_evictions_total", "kind" => "attribute").increment(attributes as u64);
    histogram!("dispatch_sweep_duration_seconds").record(held.as_secs_f64());
}
