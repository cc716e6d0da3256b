//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sink_connections_accepted_total` (counter)
//! - `sink_connections_rejected_total` (counter): dropped at capacity
//! - `sink_connections_retired_total` (counter): by `reason`
//! - `sink_connections_released_total` (counter)
//! - `sink_bytes_discarded_total` (counter)
//! - `sink_connections_active` / `sink_connections_closing` (gauges)
//!
//! Recording without an installed exporter is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_accepted() {
    metrics::counter!("sink_connections_accepted_total").increment(1);
}

pub fn record_rejected() {
    metrics::counter!("sink_connections_rejected_total").increment(1);
}

pub fn record_retired(reason: &'static str) {
    metrics::counter!("sink_connections_retired_total", "reason" => reason).increment(1);
}

pub fn record_released(count: usize) {
    metrics::counter!("sink_connections_released_total").increment(count as u64);
}

pub fn record_bytes_discarded(bytes: usize) {
    metrics::counter!("sink_bytes_discarded_total").increment(bytes as u64);
}

pub fn record_connection_counts(active: usize, closing: usize) {
    metrics::gauge!("sink_connections_active").set(active as f64);
    metrics::gauge!("sink_connections_closing").set(closing as f64);
}
