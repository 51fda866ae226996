//! Metrics collection and exposition.
//!
//! # Metrics
//! - `conveyor_connections_accepted_total` (counter)
//! - `conveyor_active_connections` (gauge)
//! - `conveyor_accept_errors_total` (counter)
//! - `conveyor_tls_handshake_failures_total` (counter)
//! - `conveyor_parse_failures_total` (counter, label `reason`)
//! - `conveyor_requests_enqueued_total` (counter)
//! - `conveyor_handler_duration_seconds` (histogram)
//! - `conveyor_handler_timeouts_total` (counter)
//! - `conveyor_handler_panics_total` (counter)
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    if let Err(e) = builder.install() {
        tracing::error!(error = %e, "Failed to install Prometheus recorder");
    } else {
        tracing::info!(address = %addr, "Metrics endpoint listening");
    }
}

pub fn record_connection_accepted() {
    counter!("conveyor_connections_accepted_total").increment(1);
}

pub fn set_active_connections(count: u64) {
    gauge!("conveyor_active_connections").set(count as f64);
}

pub fn record_accept_error() {
    counter!("conveyor_accept_errors_total").increment(1);
}

pub fn record_tls_handshake_failure() {
    counter!("conveyor_tls_handshake_failures_total").increment(1);
}

pub fn record_parse_failure(reason: &'static str) {
    counter!("conveyor_parse_failures_total", "reason" => reason).increment(1);
}

pub fn record_request_enqueued() {
    counter!("conveyor_requests_enqueued_total").increment(1);
}

pub fn record_handler_duration(start: Instant) {
    histogram!("conveyor_handler_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_handler_timeout() {
    counter!("conveyor_handler_timeouts_total").increment(1);
}

pub fn record_handler_panic() {
    counter!("conveyor_handler_panics_total").increment(1);
}
