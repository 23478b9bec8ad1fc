//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (requests, latency, connections, reloads)
//! - Expose a Prometheus-compatible scrape endpoint when enabled
//!
//! # Metrics
//! - `buckit_requests_total` (counter): requests by status
//! - `buckit_request_duration_seconds` (histogram): time to response headers
//! - `buckit_open_connections` (gauge): current connection count
//! - `buckit_config_reloads_total` (counter): reloads by result
//! - `buckit_bytes_streamed_total` (counter): object bytes sent to clients
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels kept low-cardinality (no host or key labels)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record one finished request.
pub fn record_request(status: u16, start: Instant) {
    counter!("buckit_requests_total", "status" => status.to_string()).increment(1);
    histogram!("buckit_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record the outcome of a configuration install.
pub fn record_reload(accepted: bool) {
    let result = if accepted { "accepted" } else { "rejected" };
    counter!("buckit_config_reloads_total", "result" => result).increment(1);
}

/// Record bytes delivered for one object transfer.
pub fn record_bytes_streamed(bytes: u64) {
    counter!("buckit_bytes_streamed_total").increment(bytes);
}

/// Set the number of open client connections.
pub fn set_open_connections(count: u64) {
    gauge!("buckit_open_connections").set(count as f64);
}
