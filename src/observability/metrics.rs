//! Metrics emitted by the router and its transports.
//!
//! # Metrics
//! - `router_dispatch_total` (counter): dispatches by outcome
//!   (`mounted`, `bypass`, `default`, `unsupported`)
//! - `transport_requests_total` (counter): requests by transport and status
//!   (`error` when the transport failed)
//! - `transport_request_duration_seconds` (histogram): latency by transport

use std::time::Instant;

use metrics::{counter, histogram};

pub fn record_dispatch(outcome: &'static str) {
    counter!("router_dispatch_total", "outcome" => outcome).increment(1);
}

pub fn record_transport_request(transport: &str, status: Option<u16>, start: Instant) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    counter!(
        "transport_requests_total",
        "transport" => transport.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "transport_request_duration_seconds",
        "transport" => transport.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
