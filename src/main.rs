//! Traced placeholder microservices.
//!
//! ```text
//!   ms-payment ──GET /get_product──▶ ms-catalog        (3s simulated work)
//!        │
//!        └─────GET /authorize────▶ ms-authorization   (2s simulated work)
//!
//!   every hop carries W3C traceparent; every process exports spans over OTLP
//! ```
//!
//! One binary, one service per process:
//!
//! ```text
//! traced-services authorization
//! traced-services catalog --config catalog.toml
//! traced-services payment --bind 127.0.0.1:8080
//! ```

use std::path::PathBuf;

use clap::Parser;

use traced_services::config::loader::load_config;
use traced_services::config::{ServiceConfig, ServiceKind};
use traced_services::lifecycle::startup;

#[derive(Parser)]
#[command(name = "traced-services")]
#[command(about = "Placeholder microservices instrumented with OpenTelemetry", long_about = None)]
struct Cli {
    /// Service to run: authorization, catalog or payment. Defaults to
    /// `[service] kind` from the config file, then authorization.
    service: Option<ServiceKind>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address override (e.g. 0.0.0.0:8081).
    #[arg(short, long)]
    bind: Option<String>,

    /// Simulated latency override in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// OTLP collector endpoint override.
    #[arg(long)]
    otlp_endpoint: Option<String>,

    /// Run without exporting spans.
    #[arg(long)]
    no_export: bool,
}

impl Cli {
    /// Layer command-line overrides on top of `config`.
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(kind) = self.service {
            config.service.kind = kind;
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = Some(bind);
        }
        if let Some(delay_ms) = self.delay_ms {
            config.handler.delay_ms = Some(delay_ms);
        }
        if let Some(endpoint) = self.otlp_endpoint {
            config.tracing.endpoint = endpoint;
        }
        if self.no_export {
            config.tracing.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = ServiceConfig::default();
            config.apply_env();
            config
        }
    };
    cli.apply(&mut config);

    startup::run(config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_survives_without_positional() {
        let mut config = ServiceConfig::for_kind(ServiceKind::Payment);
        Cli::try_parse_from(["traced-services", "--config", "payment.toml"])
            .unwrap()
            .apply(&mut config);
        assert_eq!(config.kind(), ServiceKind::Payment);
    }

    #[test]
    fn positional_kind_overrides_file() {
        let mut config = ServiceConfig::for_kind(ServiceKind::Payment);
        Cli::try_parse_from(["traced-services", "catalog", "--delay-ms", "5", "--no-export"])
            .unwrap()
            .apply(&mut config);
        assert_eq!(config.kind(), ServiceKind::Catalog);
        assert_eq!(config.handler.delay_ms, Some(5));
        assert!(!config.tracing.enabled);
    }
}
