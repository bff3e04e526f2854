//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_bytes_total{direction}` (counter): bytes moved through tunnels
//! - `relay_tunnels_active` (gauge): tunnels currently relaying
//! - `relay_requests_total{method,status}` (counter): proxied exchanges
//! - `gateway_push_total{outcome}` (counter): gateway push results

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Starts the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(err) => tracing::error!(address = %addr, error = %err, "Failed to start metrics endpoint"),
    }
}

pub fn record_tunnel_bytes(left_to_right: u64, right_to_left: u64) {
    ::metrics::counter!("relay_bytes_total", "direction" => "left_to_right").increment(left_to_right);
    ::metrics::counter!("relay_bytes_total", "direction" => "right_to_left").increment(right_to_left);
}

pub fn record_request(method: &str, status: u16) {
    ::metrics::counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_push(outcome: &'static str) {
    ::metrics::counter!("gateway_push_total", "outcome" => outcome).increment(1);
}

/// Holds `relay_tunnels_active` up for as long as it lives.
#[derive(Debug)]
pub struct TunnelGauge(());

impl TunnelGauge {
    pub fn enter() -> Self {
        ::metrics::gauge!("relay_tunnels_active").increment(1.0);
        Self(())
    }
}

impl Drop for TunnelGauge {
    fn drop(&mut self) {
        ::metrics::gauge!("relay_tunnels_active").decrement(1.0);
    }
}
