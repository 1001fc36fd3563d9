//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global subscriber exactly once
//! - Bridge `tracing` spans into the OpenTelemetry pipeline
//! - Configure log level and format
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - JSON format for production, pretty format for development
//! - The log level filters console output only; span export has its own
//!   fixed filter so a quiet log never drops spans
//! - Exporter transport crates are silenced so export never traces itself

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::observability::{TelemetryError, TracingContext};

/// Crates on the span export path.
const TRANSPORT_TARGETS: [&str; 3] = ["h2", "hyper_util", "tonic"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console directives used when `RUST_LOG` is absent.
pub fn default_directives(level: &str) -> String {
    let mut directives = level.to_string();
    for target in TRANSPORT_TARGETS {
        directives.push_str(&format!(",{}=off", target));
    }
    directives.push_str(",tower::buffer=off,opentelemetry_sdk=warn");
    directives
}

/// Spans handed to the tracer: everything at info and above, minus the
/// exporter's own transport.
pub fn export_filter() -> Targets {
    TRANSPORT_TARGETS
        .iter()
        .fold(Targets::new().with_default(LevelFilter::INFO), |targets, target| {
            targets.with_target(*target, LevelFilter::OFF)
        })
}

/// Layers of the process subscriber: OpenTelemetry bridge plus console
/// output, each with its own filter.
pub fn layers(
    config: &ObservabilityConfig,
    tracing_ctx: &TracingContext,
) -> Result<Vec<BoxedLayer>, TelemetryError> {
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(&config.log_level))
            .map_err(|e| TelemetryError::Filter(e.to_string()))?,
    };

    let otel = tracing_opentelemetry::layer()
        .with_tracer(tracing_ctx.tracer())
        .with_filter(export_filter())
        .boxed();

    let console = match config.log_format {
        LogFormat::Json => fmt::layer().json().with_filter(console_filter).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_filter(console_filter).boxed(),
        LogFormat::Pretty => fmt::layer().with_filter(console_filter).boxed(),
    };

    Ok(vec![otel, console])
}

/// Install the process-wide subscriber.
///
/// Fails with [`TelemetryError::SubscriberInstall`] if a subscriber is
/// already set, so a second bootstrap in one process is rejected.
pub fn init(config: &ObservabilityConfig, tracing_ctx: &TracingContext) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(layers(config, tracing_ctx)?)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInstall(e.to_string()))
}
