//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the service's single route
//! - Wire up middleware (request ID, tracing, metrics)
//! - Continue the caller's trace on every server span
//! - Bind server to listener and drain on shutdown

use std::time::Duration;

use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{MakeSpan, OnResponse, TraceLayer};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::{ServiceConfig, ServiceKind};
use crate::http::handlers::{self, StubState};
use crate::http::payment::{self, PaymentClient};
use crate::http::request::{request_id, UuidRequestId};
use crate::lifecycle::ShutdownListener;
use crate::observability::{metrics, TracingContext};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP server for one service.
///
/// Construction needs a [`TracingContext`], so no request can be served
/// before the tracer bootstrap has completed.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    tracing: TracingContext,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig, tracing: TracingContext) -> Result<Self, ServerError> {
        let router = Self::build_router(&config, &tracing)?;
        Ok(Self {
            router,
            config,
            tracing,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, tracing: &TracingContext) -> Result<Router, ServerError> {
        let kind = config.kind();
        let routes = match kind {
            ServiceKind::Authorization => Router::new()
                .route(kind.route(), get(handlers::authorize))
                .with_state(StubState {
                    delay: config.delay(),
                }),
            ServiceKind::Catalog => Router::new()
                .route(kind.route(), get(handlers::get_product))
                .with_state(StubState {
                    delay: config.delay(),
                }),
            ServiceKind::Payment => Router::new()
                .route(kind.route(), post(payment::process_payment))
                .with_state(PaymentClient::new(&config.upstreams, tracing.clone())?),
        };

        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(ServerSpan::new(tracing.clone()))
                    .on_response(RecordStatus),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(middleware::from_fn(metrics::track_requests));

        Ok(routes.layer(layers))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.tracing.service_name(),
            route = self.config.kind().route(),
            exporting = self.tracing.is_exporting(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Builds the per-request server span as a child of any remote parent.
#[derive(Debug, Clone)]
pub struct ServerSpan {
    tracing: TracingContext,
}

impl ServerSpan {
    pub fn new(tracing: TracingContext) -> Self {
        Self { tracing }
    }
}

impl<B> MakeSpan<B> for ServerSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str)
            .unwrap_or_else(|| request.uri().path());

        let span = tracing::info_span!(
            "request",
            otel.name = %format!("{} {}", request.method(), route),
            otel.kind = "server",
            otel.status_code = tracing::field::Empty,
            http.request.method = %request.method(),
            http.route = %route,
            url.path = %request.uri().path(),
            request_id = %request_id(request),
            http.response.status_code = tracing::field::Empty,
        );

        let _ = span.set_parent(self.tracing.extract(request.headers()));
        span
    }
}

/// Records the status on the server span; 5xx marks it as an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordStatus;

impl<B> OnResponse<B> for RecordStatus {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        span.record("http.response.status_code", status.as_u16());
        if status.is_server_error() {
            span.record("otel.status_code", "ERROR");
        }
        tracing::debug!(
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "Response sent"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    fn server(kind: ServiceKind, delay_ms: u64) -> HttpServer {
        let mut config = ServiceConfig::for_kind(kind);
        config.handler.delay_ms = Some(delay_ms);
        HttpServer::new(config, TracingContext::untraced(kind.default_name()).unwrap()).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn authorize_route_answers_with_request_id() {
        let response = server(ServiceKind::Authorization, 0)
            .router()
            .oneshot(Request::get("/authorize").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_string(response).await, r#"{"status":"authorized"}"#);
    }

    #[tokio::test]
    async fn caller_request_id_is_echoed() {
        let response = server(ServiceKind::Catalog, 0)
            .router()
            .oneshot(
                Request::get("/get_product")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
        assert_eq!(
            body_string(response).await,
            r#"{"id":"123","name":"Example Product","price":49.99}"#
        );
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = server(ServiceKind::Catalog, 0)
            .router()
            .oneshot(Request::get("/authorize").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_is_not_allowed() {
        let response = server(ServiceKind::Authorization, 0)
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/authorize")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn malformed_payment_is_bad_request() {
        let response = server(ServiceKind::Payment, 0)
            .router()
            .oneshot(
                Request::post("/process_payment")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"product_id\":"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("\"error\""));
    }
}
