//! Distributed tracing bootstrap.
//!
//! # Responsibilities
//! - Build the process tracer provider tagged with the service identity
//! - Export spans to an OTLP collector over gRPC
//! - Extract trace context from incoming requests
//! - Inject trace context into outgoing requests
//!
//! # Design Decisions
//! - `TracingContext` is built once at startup and handed to logging and the
//!   HTTP server; nothing else can create server spans
//! - Supports W3C Trace Context and Baggage headers
//! - A provider always exists; without an exporter spans are simply dropped

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{Context, KeyValue};
use opentelemetry_http::{HeaderExtractor, HeaderInjector};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{
    RandomIdGenerator, Sampler, SdkTracer, SdkTracerProvider, SpanExporter, TracerProviderBuilder,
};
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::TracingConfig;
use crate::observability::TelemetryError;

/// Handle to the process tracing pipeline.
///
/// Cheap to clone; all clones share one provider.
#[derive(Clone)]
pub struct TracingContext {
    inner: Arc<Inner>,
}

struct Inner {
    service_name: String,
    provider: SdkTracerProvider,
    propagator: TextMapCompositePropagator,
    exporting: bool,
    export_error: Option<String>,
}

impl TracingContext {
    /// Bootstrap tracing for `service_name`.
    ///
    /// Exporter build failures abort only when `config.required` is set;
    /// otherwise the context comes back without an exporter and
    /// [`export_error`](Self::export_error) says why.
    pub fn init(service_name: &str, config: &TracingConfig) -> Result<Self, TelemetryError> {
        let service_name = checked_name(service_name)?;

        if !config.enabled {
            return Ok(Self::assemble(service_name, base_builder(service_name, config), false, None));
        }

        match build_otlp_exporter(config) {
            Ok(exporter) => {
                let builder = base_builder(service_name, config).with_batch_exporter(exporter);
                Ok(Self::assemble(service_name, builder, true, None))
            }
            Err(e) if config.required => Err(e),
            Err(e) => Ok(Self::assemble(
                service_name,
                base_builder(service_name, config),
                false,
                Some(e.to_string()),
            )),
        }
    }

    /// Context that keeps identity but exports nothing.
    pub fn untraced(service_name: &str) -> Result<Self, TelemetryError> {
        Self::init(
            service_name,
            &TracingConfig {
                enabled: false,
                ..TracingConfig::default()
            },
        )
    }

    /// Context exporting synchronously to a caller-supplied exporter.
    pub fn with_exporter<E>(service_name: &str, exporter: E) -> Result<Self, TelemetryError>
    where
        E: SpanExporter + 'static,
    {
        let service_name = checked_name(service_name)?;
        let builder = base_builder(service_name, &TracingConfig::default()).with_simple_exporter(exporter);
        Ok(Self::assemble(service_name, builder, true, None))
    }

    fn assemble(
        service_name: &str,
        builder: TracerProviderBuilder,
        exporting: bool,
        export_error: Option<String>,
    ) -> Self {
        let propagator = TextMapCompositePropagator::new(vec![
            Box::new(TraceContextPropagator::new()),
            Box::new(BaggagePropagator::new()),
        ]);

        Self {
            inner: Arc::new(Inner {
                service_name: service_name.to_string(),
                provider: builder.build(),
                propagator,
                exporting,
                export_error,
            }),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// Whether spans leave the process.
    pub fn is_exporting(&self) -> bool {
        self.inner.exporting
    }

    /// Why export was disabled despite being configured.
    pub fn export_error(&self) -> Option<&str> {
        self.inner.export_error.as_deref()
    }

    /// Tracer whose instrumentation scope is the service identity.
    pub fn tracer(&self) -> SdkTracer {
        self.inner.provider.tracer(self.inner.service_name.clone())
    }

    /// Remote parent context carried by request headers, if any.
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        self.inner.propagator.extract(&HeaderExtractor(headers))
    }

    /// Write `cx` into `headers` as `traceparent` / `baggage`.
    pub fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.inner.propagator.inject_context(cx, &mut HeaderInjector(headers));
    }

    /// Headers that continue the trace of `span` in another service.
    pub fn headers_for(&self, span: &tracing::Span) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.inject(&span.context(), &mut headers);
        headers
    }

    /// Flush pending spans and stop the provider. Blocks; call off the
    /// async executor.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        self.inner
            .provider
            .shutdown()
            .map_err(|e| TelemetryError::Shutdown(e.to_string()))
    }
}

impl fmt::Debug for TracingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingContext")
            .field("service_name", &self.inner.service_name)
            .field("exporting", &self.inner.exporting)
            .finish()
    }
}

fn checked_name(service_name: &str) -> Result<&str, TelemetryError> {
    let trimmed = service_name.trim();
    if trimmed.is_empty() {
        return Err(TelemetryError::EmptyServiceName);
    }
    Ok(trimmed)
}

fn base_builder(service_name: &str, config: &TracingConfig) -> TracerProviderBuilder {
    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build();

    SdkTracerProvider::builder()
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            config.sample_ratio,
        ))))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
}

fn build_otlp_exporter(
    config: &TracingConfig,
) -> Result<opentelemetry_otlp::SpanExporter, TelemetryError> {
    opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.endpoint.clone())
        .with_timeout(Duration::from_secs(config.export_timeout_secs))
        .build()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))
}
