//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, server span with remote parent)
//!     → request.rs (request ID)
//!     → handlers.rs (delay + static body)  |  payment.rs (upstream fan-out)
//!     → Send to client
//! ```

pub mod handlers;
pub mod payment;
pub mod request;
pub mod server;

pub use handlers::{AuthorizationStatus, Product};
pub use payment::{PaymentClient, PaymentError, PaymentRequest};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
