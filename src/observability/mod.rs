//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     tracing.rs  TracingContext::init (provider + exporter + propagator)
//!     → logging.rs (subscriber: filter + fmt + OpenTelemetry layer)
//!     → metrics.rs (optional Prometheus exporter)
//!
//! Per request:
//!     http layer extracts W3C trace context → server span (child of caller)
//!     handlers emit structured events inside that span
//!     outgoing calls inject the current span's context
//! ```
//!
//! # Design Decisions
//! - The tracer is an explicit handle passed to whoever needs it; no global
//!   tracer provider or propagator is installed
//! - Export is best effort: a missing collector never stops serving
//! - Request ID flows through all subsystems

pub mod logging;
pub mod metrics;
pub mod tracing;

use thiserror::Error;

pub use self::tracing::TracingContext;

/// Errors raised while wiring up observability.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("failed to build span exporter: {0}")]
    Exporter(String),

    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInstall(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(String),

    #[error("tracer provider shutdown failed: {0}")]
    Shutdown(String),
}
