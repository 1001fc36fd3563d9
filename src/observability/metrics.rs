//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_server_requests_total` (counter): requests by method, route, status
//! - `http_server_request_duration_seconds` (histogram): latency distribution
//! - `payments_succeeded_total` (counter)
//! - `payments_failed_total` (counter): failures by reason
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::observability::TelemetryError;

/// Install the Prometheus recorder with its own scrape listener.
pub fn init_metrics(address: &str) -> Result<(), TelemetryError> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|_| TelemetryError::Metrics(format!("'{}' is not a socket address", address)))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, route: &str, status: u16, start_time: Instant) {
    let elapsed = start_time.elapsed().as_secs_f64();
    counter!(
        "http_server_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "http_server_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(elapsed);
}

pub fn record_payment_success() {
    counter!("payments_succeeded_total").increment(1);
}

pub fn record_payment_failure(reason: &'static str) {
    counter!("payments_failed_total", "reason" => reason).increment(1);
}

/// Middleware recording count and latency for every request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;
    record_request(&method, &route, response.status().as_u16(), start_time);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_address_is_rejected_before_install() {
        assert!(matches!(
            init_metrics("metrics.local"),
            Err(TelemetryError::Metrics(_))
        ));
    }
}
