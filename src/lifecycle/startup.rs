//! Startup orchestration.
//!
//! Order is fixed: validation → tracer bootstrap → subscriber → metrics →
//! server → listener. The listener binds only after tracing is fully
//! configured, and the tracer provider is flushed once the server has
//! drained. The shutdown signal is latched, so one that arrives mid-startup
//! stops the service as soon as it would start serving.

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::loader::finalize;
use crate::config::{ConfigError, ServiceConfig};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown, ShutdownListener};
use crate::observability::{logging, metrics, TelemetryError, TracingContext};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Boot the configured service and serve until a shutdown signal arrives.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    signals::forward_to(shutdown);
    serve(config, shutdown_rx).await
}

/// Same as [`run`] but stops when `shutdown` is triggered by the caller.
pub async fn run_until(config: ServiceConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    serve(config, shutdown.subscribe()).await
}

async fn serve(
    config: ServiceConfig,
    shutdown_rx: ShutdownListener,
) -> Result<(), StartupError> {
    let config = finalize(config)?;

    let tracing_ctx = TracingContext::init(config.service_name(), &config.tracing)?;
    logging::init(&config.observability, &tracing_ctx)?;

    tracing::info!(
        service = %tracing_ctx.service_name(),
        kind = %config.kind(),
        version = env!("CARGO_PKG_VERSION"),
        "Tracer bootstrap complete"
    );
    if let Some(reason) = tracing_ctx.export_error() {
        tracing::warn!(error = %reason, "Span export unavailable, serving untraced");
    } else if !tracing_ctx.is_exporting() {
        tracing::info!("Span export disabled by configuration");
    } else {
        tracing::info!(endpoint = %config.tracing.endpoint, "Exporting spans over OTLP");
    }

    if config.observability.metrics_enabled {
        metrics::init_metrics(&config.observability.metrics_address)?;
    }

    let bind_address = config.bind_address();
    let server = HttpServer::new(config, tracing_ctx.clone())?;

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let served = server.run(listener, shutdown_rx).await;

    let flush_ctx = tracing_ctx.clone();
    match tokio::task::spawn_blocking(move || flush_ctx.shutdown()).await {
        Ok(Ok(())) => tracing::info!("Tracer provider flushed"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Tracer provider shutdown failed"),
        Err(e) => tracing::warn!(error = %e, "Tracer flush task failed"),
    }

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}
