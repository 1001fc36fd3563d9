//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};

use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use traced_services::config::{ObservabilityConfig, ServiceConfig, ServiceKind};
use traced_services::observability::logging;
use traced_services::{HttpServer, Shutdown, TracingContext};

/// Install the process subscriber once per test binary so spans get
/// OpenTelemetry contexts and trace headers are emitted.
#[allow(dead_code)]
pub fn telemetry() -> TracingContext {
    static CTX: OnceLock<TracingContext> = OnceLock::new();
    CTX.get_or_init(|| {
        let ctx = TracingContext::untraced("integration-tests").unwrap();
        let config = ObservabilityConfig {
            log_level: "info".to_string(),
            ..ObservabilityConfig::default()
        };
        let _ = logging::init(&config, &ctx);
        ctx
    })
    .clone()
}

/// Config for `kind` bound to an ephemeral local port with the given delay.
#[allow(dead_code)]
pub fn local_config(kind: ServiceKind, delay_ms: Option<u64>) -> ServiceConfig {
    let mut config = ServiceConfig::for_kind(kind);
    config.listener.bind_address = Some("127.0.0.1:0".to_string());
    config.handler.delay_ms = delay_ms;
    config.tracing.enabled = false;
    config
}

/// Start a service on an ephemeral port. Returns its address and the
/// shutdown handle that stops it.
#[allow(dead_code)]
pub async fn spawn_service(config: ServiceConfig) -> (SocketAddr, Shutdown) {
    let tracing = TracingContext::untraced(config.service_name()).unwrap();
    let server = HttpServer::new(config.clone(), tracing).unwrap();
    let listener = TcpListener::bind(config.bind_address()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// Headers seen by a recording backend, in arrival order.
#[allow(dead_code)]
pub type Recorded = Arc<Mutex<Vec<HeaderMap>>>;

/// Start a backend that answers `path` with a fixed status and JSON body and
/// records the request headers.
#[allow(dead_code)]
pub async fn start_recording_backend(
    path: &'static str,
    status: StatusCode,
    body: &'static str,
) -> (SocketAddr, Recorded) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let seen = recorded.clone();

    let app = Router::new().route(
        path,
        get(move |headers: HeaderMap| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(headers);
                (status, [("content-type", "application/json")], body)
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, recorded)
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Poll `addr` until something accepts connections.
#[allow(dead_code)]
pub async fn wait_until_listening(addr: SocketAddr) {
    for _ in 0..100 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    panic!("nothing listening on {}", addr);
}
