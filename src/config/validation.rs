//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ratios in [0, 1], addresses parse, timeouts > 0)
//! - Check that the payment service has usable upstream URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{ServiceConfig, ServiceKind};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service_name().trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }

    let bind = config.bind_address();
    if bind.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", bind),
        ));
    }

    let ratio = config.tracing.sample_ratio;
    if !(0.0..=1.0).contains(&ratio) {
        errors.push(ValidationError::new(
            "tracing.sample_ratio",
            format!("{} is outside [0.0, 1.0]", ratio),
        ));
    }

    if config.tracing.enabled && config.tracing.endpoint.trim().is_empty() {
        errors.push(ValidationError::new(
            "tracing.endpoint",
            "required when tracing is enabled",
        ));
    }

    if config.tracing.export_timeout_secs == 0 {
        errors.push(ValidationError::new("tracing.export_timeout_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if config.kind() == ServiceKind::Payment {
        let upstreams = &config.upstreams;
        for (field, url) in [
            ("upstreams.catalog_url", &upstreams.catalog_url),
            ("upstreams.authorization_url", &upstreams.authorization_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError::new(
                    field,
                    format!("'{}' must be an http(s) URL", url),
                ));
            }
        }
        if upstreams.request_timeout_secs == 0 {
            errors.push(ValidationError::new("upstreams.request_timeout_secs", "must be > 0"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_for_every_kind() {
        for kind in [ServiceKind::Authorization, ServiceKind::Catalog, ServiceKind::Payment] {
            assert_eq!(validate_config(&ServiceConfig::for_kind(kind)), Ok(()));
        }
    }

    #[test]
    fn reports_every_error() {
        let mut config = ServiceConfig::for_kind(ServiceKind::Payment);
        config.service.name = Some("  ".into());
        config.listener.bind_address = Some("not-an-addr".into());
        config.tracing.sample_ratio = 1.5;
        config.upstreams.catalog_url = "localhost:3333".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "service.name",
                "listener.bind_address",
                "tracing.sample_ratio",
                "upstreams.catalog_url",
            ]
        );
    }

    #[test]
    fn upstreams_ignored_for_stub_services() {
        let mut config = ServiceConfig::for_kind(ServiceKind::Authorization);
        config.upstreams.catalog_url = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn endpoint_only_required_when_enabled() {
        let mut config = ServiceConfig::for_kind(ServiceKind::Catalog);
        config.tracing.endpoint = String::new();
        assert!(validate_config(&config).is_err());

        config.tracing.enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
