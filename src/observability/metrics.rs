//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_proxy_requests_total` (counter): proxy page loads by outcome
//! - `relay_proxy_fetch_duration_seconds` (histogram): upstream fetch latency by outcome
//! - `relay_rewrite_skips_total` (counter): references left unresolved
//! - `relay_bookmark_mutations_total` (counter): store mutations by action
//! - `relay_broadcasts_total` (counter) / `relay_broadcast_deliveries_total` (counter)
//! - `relay_sessions_active` (gauge): connected real-time sessions
//! - `relay_sessions_dropped_total` (counter): sessions dropped for lagging
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_proxy_request(outcome: &'static str) {
    counter!("relay_proxy_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_fetch(outcome: &'static str, start: Instant) {
    histogram!("relay_proxy_fetch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rewrite_skips(count: usize) {
    counter!("relay_rewrite_skips_total").increment(count as u64);
}

pub fn record_bookmark_mutation(action: &'static str) {
    counter!("relay_bookmark_mutations_total", "action" => action).increment(1);
}

pub fn record_broadcast(delivered: usize) {
    counter!("relay_broadcasts_total").increment(1);
    counter!("relay_broadcast_deliveries_total").increment(delivered as u64);
}

pub fn record_sessions(active: usize) {
    gauge!("relay_sessions_active").set(active as f64);
}

pub fn record_session_dropped() {
    counter!("relay_sessions_dropped_total").increment(1);
}
