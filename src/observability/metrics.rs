//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (sessions, utterances, replies)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `intercom_sessions_active` (gauge): live session tasks
//! - `intercom_sessions_total` (counter): finished sessions by close reason
//! - `intercom_utterances_total` (counter): dispatched utterances by outcome
//! - `intercom_utterance_bytes` (histogram): captured audio size
//! - `intercom_replies_total` (counter): reply attempts by outcome

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_opened() {
    gauge!("intercom_sessions_active").increment(1.0);
}

pub fn record_session_finished() {
    gauge!("intercom_sessions_active").decrement(1.0);
}

pub fn record_session_closed(reason: &'static str) {
    counter!("intercom_sessions_total", "reason" => reason).increment(1);
}

pub fn record_utterance(outcome: &'static str, bytes: usize) {
    counter!("intercom_utterances_total", "outcome" => outcome).increment(1);
    histogram!("intercom_utterance_bytes").record(bytes as f64);
}

pub fn record_reply(outcome: &'static str) {
    counter!("intercom_replies_total", "outcome" => outcome).increment(1);
}
