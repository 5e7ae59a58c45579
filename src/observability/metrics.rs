//! Metrics collection and exposition.
//!
//! # Metrics
//! - `signalman_signals_dispatched_total` (counter): by signal, source, outcome
//! - `signalman_unsupported_registrations_total` (counter): by signal
//! - `signalman_forced_exits_total` (counter): by exit code
//! - `signalman_control_requests_total` (counter): by HTTP status

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::signals::LogicalSignal;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_dispatch(signal: LogicalSignal, source: &'static str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    counter!(
        "signalman_signals_dispatched_total",
        "signal" => signal.id(),
        "source" => source,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_unsupported(signal: LogicalSignal) {
    counter!("signalman_unsupported_registrations_total", "signal" => signal.id()).increment(1);
}

pub fn record_forced_exit(code: i32) {
    counter!("signalman_forced_exits_total", "code" => code.to_string()).increment(1);
}

pub fn record_control_request(status: u16) {
    counter!("signalman_control_requests_total", "status" => status.to_string()).increment(1);
}
