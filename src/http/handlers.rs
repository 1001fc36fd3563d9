//! Placeholder endpoint handlers.
//!
//! Each handler suspends for the configured delay, then answers 200 with a
//! literal body. The suspension is a `tokio::time::sleep`, so concurrent
//! requests proceed independently. If the client goes away the handler
//! future is dropped along with its timer.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

/// Body of `GET /authorize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationStatus {
    pub status: String,
}

/// Body of `GET /get_product`; also what the payment service reads back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
}

pub fn authorization_payload() -> AuthorizationStatus {
    AuthorizationStatus {
        status: "authorized".to_string(),
    }
}

pub fn catalog_payload() -> Product {
    Product {
        id: "123".to_string(),
        name: "Example Product".to_string(),
        price: 49.99,
    }
}

/// State shared by the stub handlers.
#[derive(Debug, Clone, Copy)]
pub struct StubState {
    pub delay: Duration,
}

/// Stand-in for downstream work.
async fn simulate_work(delay: Duration) {
    let span = tracing::info_span!("simulated_work", delay_ms = delay.as_millis() as u64);
    tokio::time::sleep(delay).instrument(span).await;
}

pub async fn authorize(State(state): State<StubState>) -> impl IntoResponse {
    simulate_work(state.delay).await;
    tracing::debug!("authorization granted");
    (StatusCode::OK, Json(authorization_payload()))
}

pub async fn get_product(State(state): State<StubState>) -> impl IntoResponse {
    simulate_work(state.delay).await;
    tracing::debug!("product served");
    (StatusCode::OK, Json(catalog_payload()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn payloads_serialize_exactly() {
        assert_eq!(
            serde_json::to_string(&authorization_payload()).unwrap(),
            r#"{"status":"authorized"}"#
        );
        assert_eq!(
            serde_json::to_string(&catalog_payload()).unwrap(),
            r#"{"id":"123","name":"Example Product","price":49.99}"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_the_full_delay() {
        let start = Instant::now();
        let tokio_start = tokio::time::Instant::now();
        let response = authorize(State(StubState {
            delay: Duration::from_millis(2000),
        }))
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(tokio_start.elapsed() >= Duration::from_millis(2000));
        // paused clock auto-advances, no real waiting
        assert!(start.elapsed() < Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_suspensions_overlap() {
        let tokio_start = tokio::time::Instant::now();
        let state = StubState {
            delay: Duration::from_millis(3000),
        };

        let handles: Vec<_> = (0..8)
            .map(|_| tokio::spawn(get_product(State(state))))
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().into_response().status(), StatusCode::OK);
        }

        let elapsed = tokio_start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(6000));
    }
}
