//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): routing decisions by `outcome`
//!   (`matched`, `default`, `not_found`, `ambiguous`)
//! - `router_routes` (gauge): bindings in the most recently changed router
//! - `http_requests_total` (counter): adapter responses by method, status
//! - `http_request_duration_seconds` (histogram): adapter latency
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so library users and tests pay nothing
//! - The Prometheus exporter is installed only by the server binary

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must run inside a Tokio runtime. Failure is logged, not fatal.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_route(outcome: &'static str) {
    metrics::counter!("router_requests_total", "outcome" => outcome).increment(1);
}

pub fn set_route_count(count: usize) {
    metrics::gauge!("router_routes").set(count as f64);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}
