//! Axum router configuration for the payment endpoints.

use axum::{
    routing::{any, get, post},
    Router,
};

use super::handlers::{health, receive_webhook, verify_payment, PaymentsAppState};

/// Webhook ingress routes.
///
/// # Routes
/// - `ANY /:gateway` - Gateway deliveries (non-POST answered with 405)
pub fn webhook_routes() -> Router<PaymentsAppState> {
    Router::new().route("/:gateway", any(receive_webhook))
}

/// Verification routes.
///
/// # Routes
/// - `POST /verify` - Pull verification of one payment
pub fn verification_routes() -> Router<PaymentsAppState> {
    Router::new().route("/verify", post(verify_payment))
}

/// Create the complete payments router.
///
/// Mounts webhook ingress at `/webhooks`, verification at `/payments` and
/// the liveness probe at `/health`.
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/webhooks", webhook_routes())
        .nest("/payments", verification_routes())
}
