//! HTTP adapter for payment endpoints.
//!
//! - `POST /webhooks/:gateway` - Gateway webhook ingress
//! - `POST /payments/verify` - Pull verification of a payment
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorResponse, HealthResponse, VerifyPaymentRequest};
pub use handlers::{PaymentsAppState, SIGNATURE_HEADER, STRIPE_SIGNATURE_HEADER};
pub use routes::payments_router;
