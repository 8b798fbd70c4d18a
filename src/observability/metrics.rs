//! Metrics collection and exposition.
//!
//! # Metrics
//! - `site_requests_total` (counter): requests by method, stage, status
//! - `site_request_duration_seconds` (histogram): latency by stage
//! - `site_upstream_failures_total` (counter): failed forwards by mount
//! - `site_config_reloads_total` (counter): applied hot reloads
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: no paths, no hosts

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(method: &str, stage: &'static str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "site_requests_total",
        "method" => method.to_string(),
        "stage" => stage,
        "status" => status
    )
    .increment(1);
    histogram!("site_request_duration_seconds", "stage" => stage)
        .record(start.elapsed().as_secs_f64());
}

/// Record a forward that produced no upstream response.
pub fn record_upstream_failure(mount: &str) {
    counter!("site_upstream_failures_total", "mount" => mount.to_string()).increment(1);
}

/// Record an applied configuration reload.
pub fn record_config_reload() {
    counter!("site_config_reloads_total").increment(1);
}
