//! Traced placeholder microservices.
//!
//! Hosts the authorization, catalog and payment services. Each process runs
//! one of them behind an OpenTelemetry tracer bootstrapped before the
//! listener binds.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::{ServiceConfig, ServiceKind};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::TracingContext;
