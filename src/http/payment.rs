//! Payment endpoint.
//!
//! # Data Flow
//! ```text
//! POST /process_payment {product_id, payment_token}
//!     → GET {catalog}/get_product?product_id=..   (trace context injected)
//!     → GET {authorization}/authorize             (trace context injected)
//!     → settle_payment span
//!     → 200 {"status":"Payment successful"}
//! ```
//!
//! # Error Mapping
//! - malformed body → 400
//! - catalog unreachable or unreadable → 500
//! - authorization unreachable → 500
//! - authorization answers non-200 → 403

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::Instrument;

use crate::config::UpstreamConfig;
use crate::http::handlers::Product;
use crate::observability::{metrics, TracingContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub product_id: String,
    pub payment_token: String,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("could not fetch product: {0}")]
    Catalog(#[source] reqwest::Error),

    #[error("could not authorize payment: {0}")]
    Authorization(#[source] reqwest::Error),

    #[error("payment not authorized (upstream status {0})")]
    Declined(StatusCode),
}

impl PaymentError {
    /// Label used on the failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            PaymentError::Catalog(_) => "catalog",
            PaymentError::Authorization(_) => "authorization",
            PaymentError::Declined(_) => "declined",
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        match self {
            PaymentError::Catalog(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Could not fetch product"})),
            )
                .into_response(),
            PaymentError::Authorization(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Could not authorize payment"})),
            )
                .into_response(),
            PaymentError::Declined(_) => (
                StatusCode::FORBIDDEN,
                Json(json!({"status": "Payment not authorized"})),
            )
                .into_response(),
        }
    }
}

/// Client for the catalog and authorization services.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    catalog_url: String,
    authorization_url: String,
    tracing: TracingContext,
}

impl PaymentClient {
    pub fn new(config: &UpstreamConfig, tracing: TracingContext) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            catalog_url: config.catalog_url.trim_end_matches('/').to_string(),
            authorization_url: config.authorization_url.trim_end_matches('/').to_string(),
            tracing,
        })
    }

    pub async fn fetch_product(&self, product_id: &str) -> Result<Product, PaymentError> {
        let span = tracing::info_span!(
            "GET /get_product",
            otel.kind = "client",
            peer.service = "ms-catalog",
            product_id = %product_id,
            http.response.status_code = tracing::field::Empty,
        );
        let headers = self.tracing.headers_for(&span);

        async {
            let response = self
                .http
                .get(format!("{}/get_product", self.catalog_url))
                .query(&[("product_id", product_id)])
                .headers(headers)
                .send()
                .await
                .map_err(PaymentError::Catalog)?;
            tracing::Span::current().record("http.response.status_code", response.status().as_u16());

            response
                .error_for_status()
                .map_err(PaymentError::Catalog)?
                .json::<Product>()
                .await
                .map_err(PaymentError::Catalog)
        }
        .instrument(span)
        .await
    }

    /// Ask the authorization service to approve `amount`.
    pub async fn authorize(&self, amount: f64) -> Result<(), PaymentError> {
        let span = tracing::info_span!(
            "GET /authorize",
            otel.kind = "client",
            peer.service = "ms-authorization",
            amount,
            http.response.status_code = tracing::field::Empty,
        );
        let headers = self.tracing.headers_for(&span);

        async {
            let response = self
                .http
                .get(format!("{}/authorize", self.authorization_url))
                .headers(headers)
                .send()
                .await
                .map_err(PaymentError::Authorization)?;

            let status = response.status();
            tracing::Span::current().record("http.response.status_code", status.as_u16());
            if status == StatusCode::OK {
                Ok(())
            } else {
                Err(PaymentError::Declined(status))
            }
        }
        .instrument(span)
        .await
    }

    /// Full payment flow for one request.
    pub async fn process(&self, request: &PaymentRequest) -> Result<Product, PaymentError> {
        let product = self.fetch_product(&request.product_id).await?;
        self.authorize(product.price).await?;

        tracing::info_span!(
            "settle_payment",
            product_id = %product.id,
            amount = product.price,
            otel.status_code = "OK",
        )
        .in_scope(|| tracing::info!(product_id = %product.id, "Payment successful"));

        Ok(product)
    }
}

pub async fn process_payment(
    State(client): State<PaymentClient>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected payment request");
            metrics::record_payment_failure("bad_request");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": rejection.body_text()})),
            )
                .into_response();
        }
    };

    match client.process(&request).await {
        Ok(_) => {
            metrics::record_payment_success();
            (StatusCode::OK, Json(json!({"status": "Payment successful"}))).into_response()
        }
        Err(e) => {
            tracing::warn!(product_id = %request.product_id, error = %e, "Payment failed");
            metrics::record_payment_failure(e.reason());
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declined_maps_to_forbidden() {
        let response = PaymentError::Declined(StatusCode::UNAUTHORIZED).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn request_shape_matches_wire_format() {
        let request: PaymentRequest =
            serde_json::from_str(r#"{"product_id":"123","payment_token":"tok_1"}"#).unwrap();
        assert_eq!(request.product_id, "123");
        assert_eq!(request.payment_token, "tok_1");
    }

    #[test]
    fn client_trims_trailing_slashes() {
        let config = UpstreamConfig {
            catalog_url: "http://catalog:3333/".into(),
            authorization_url: "http://auth:8081//".into(),
            request_timeout_secs: 1,
        };
        let client =
            PaymentClient::new(&config, TracingContext::untraced("ms-payment").unwrap()).unwrap();
        assert_eq!(client.catalog_url, "http://catalog:3333");
        assert_eq!(client.authorization_url, "http://auth:8081");
    }
}
