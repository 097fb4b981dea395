//! Metrics collection and exposition.
//!
//! # Metrics
//! - `greenlight_requests_rejected_total` (counter): requests stopped by the
//!   chain, labelled by `reason`
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const REQUESTS_REJECTED_TOTAL: &str = "greenlight_requests_rejected_total";

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a request rejected by the chain.
pub fn record_rejection(reason: &'static str) {
    metrics::counter!(REQUESTS_REJECTED_TOTAL, "reason" => reason).increment(1);
}
