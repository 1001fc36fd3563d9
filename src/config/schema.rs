//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a service.
//! All types derive Serde traits for deserialization from config files.
//! Fields that depend on which service is running are optional and resolve
//! against [`ServiceKind`] defaults at access time.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable consulted for the collector endpoint.
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Which placeholder service this process hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    #[default]
    Authorization,
    Catalog,
    Payment,
}

impl ServiceKind {
    /// Default service identity used to tag spans.
    pub fn default_name(self) -> &'static str {
        match self {
            ServiceKind::Authorization => "ms-authorization",
            ServiceKind::Catalog => "ms-catalog",
            ServiceKind::Payment => "ms-payment",
        }
    }

    /// Path the service's single endpoint is mounted on.
    pub fn route(self) -> &'static str {
        match self {
            ServiceKind::Authorization => "/authorize",
            ServiceKind::Catalog => "/get_product",
            ServiceKind::Payment => "/process_payment",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            ServiceKind::Authorization => 8081,
            ServiceKind::Catalog => 3333,
            ServiceKind::Payment => 8080,
        }
    }

    /// Simulated downstream latency. Payment does real upstream calls instead.
    pub fn default_delay(self) -> Duration {
        match self {
            ServiceKind::Authorization => Duration::from_millis(2000),
            ServiceKind::Catalog => Duration::from_millis(3000),
            ServiceKind::Payment => Duration::ZERO,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceKind::Authorization => "authorization",
            ServiceKind::Catalog => "catalog",
            ServiceKind::Payment => "payment",
        };
        f.write_str(s)
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "authorization" | "ms-authorization" => Ok(ServiceKind::Authorization),
            "catalog" | "ms-catalog" => Ok(ServiceKind::Catalog),
            "payment" | "ms-payment" => Ok(ServiceKind::Payment),
            other => Err(format!("unknown service kind: {}", other)),
        }
    }
}

/// Root configuration for a service process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service identity and kind.
    pub service: ServiceSection,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Handler behavior.
    pub handler: HandlerConfig,

    /// Downstream services called by the payment service.
    pub upstreams: UpstreamConfig,

    /// Distributed tracing export.
    pub tracing: TracingConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

impl ServiceConfig {
    /// Configuration with every default for the given kind.
    pub fn for_kind(kind: ServiceKind) -> Self {
        let mut config = Self::default();
        config.service.kind = kind;
        config
    }

    pub fn kind(&self) -> ServiceKind {
        self.service.kind
    }

    /// Resolved service identity.
    pub fn service_name(&self) -> &str {
        self.service
            .name
            .as_deref()
            .unwrap_or_else(|| self.service.kind.default_name())
    }

    /// Resolved bind address.
    pub fn bind_address(&self) -> String {
        self.listener
            .bind_address
            .clone()
            .unwrap_or_else(|| format!("0.0.0.0:{}", self.service.kind.default_port()))
    }

    /// Resolved handler delay.
    pub fn delay(&self) -> Duration {
        self.handler
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.service.kind.default_delay())
    }

    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var(OTLP_ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.tracing.endpoint = endpoint.trim().to_string();
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceSection {
    /// Which service to run.
    pub kind: ServiceKind,

    /// Identity override (defaults to the kind's `ms-*` name).
    pub name: Option<String>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8081"). Defaults to the kind's port.
    pub bind_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HandlerConfig {
    /// Simulated latency in milliseconds. Defaults to the kind's delay.
    pub delay_ms: Option<u64>,
}

/// Base URLs of the services the payment service calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub catalog_url: String,
    pub authorization_url: String,

    /// Per-call timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            catalog_url: "http://127.0.0.1:3333".to_string(),
            authorization_url: "http://127.0.0.1:8081".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Distributed tracing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Export spans to the collector.
    pub enabled: bool,

    /// OTLP gRPC collector endpoint.
    pub endpoint: String,

    /// Abort startup when the exporter cannot be built.
    pub required: bool,

    /// Fraction of root traces sampled (0.0 - 1.0).
    pub sample_ratio: f64,

    /// Export timeout in seconds.
    pub export_timeout_secs: u64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:4317".to_string(),
            required: false,
            sample_ratio: 1.0,
            export_timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9464".to_string(),
        }
    }
}
