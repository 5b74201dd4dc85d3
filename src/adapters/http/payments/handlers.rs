//! HTTP handlers for webhook ingress and payment verification.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::{
    ReceiveWebhookCommand, ReceiveWebhookHandler, VerificationError, VerifyPaymentHandler,
};
use crate::domain::foundation::{Timestamp, ValidationError};
use crate::domain::webhook::WebhookError;
use crate::ports::GatewayErrorCode;

use super::dto::{ErrorResponse, HealthResponse, VerifyPaymentRequest};

/// Signature header accepted for every gateway.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Alias accepted on the stripe route.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the payment routes.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub webhook_handler: Arc<ReceiveWebhookHandler>,
    pub verify_handler: Arc<VerifyPaymentHandler>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Ingress
// ════════════════════════════════════════════════════════════════════════════════

/// ANY /webhooks/:gateway - Authenticate and reconcile one delivery
///
/// Registered for every method so that non-POST requests reach the handler's
/// own 405 step.
pub async fn receive_webhook(
    State(state): State<PaymentsAppState>,
    method: Method,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let cmd = ReceiveWebhookCommand {
        method,
        signature: signature_header(&headers, &gateway),
        user_agent: header_string(&headers, header::USER_AGENT.as_str()),
        gateway,
        payload: body.to_vec(),
        received_at: Timestamp::now(),
    };

    let receipt = state.webhook_handler.handle(cmd).await?;
    Ok(Json(receipt))
}

fn signature_header(headers: &HeaderMap, gateway: &str) -> Option<String> {
    header_string(headers, SIGNATURE_HEADER).or_else(|| {
        if gateway.eq_ignore_ascii_case("stripe") {
            header_string(headers, STRIPE_SIGNATURE_HEADER)
        } else {
            None
        }
    })
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ════════════════════════════════════════════════════════════════════════════════
// Verification
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payments/verify - Pull the current status of a payment
pub async fn verify_payment(
    State(state): State<PaymentsAppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, VerifyApiError> {
    let Json(request) = payload.map_err(|e| VerifyApiError::BadRequest(e.body_text()))?;
    let query = request.into_query()?;

    let result = state.verify_handler.handle(query).await?;
    Ok(Json(result))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::ok())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Converts webhook ingress errors to HTTP responses.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let error_code = match &self.0 {
            WebhookError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            WebhookError::Configuration(_) | WebhookError::MissingSecret { .. } => {
                "CONFIGURATION_ERROR"
            }
        };

        let body = ErrorResponse::new(error_code, self.0.public_message());
        let mut response = (self.0.status_code(), Json(body)).into_response();
        if matches!(self.0, WebhookError::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Converts verification errors to HTTP responses.
pub enum VerifyApiError {
    BadRequest(String),
    Verification(VerificationError),
}

impl From<ValidationError> for VerifyApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<VerificationError> for VerifyApiError {
    fn from(err: VerificationError) -> Self {
        Self::Verification(err)
    }
}

impl IntoResponse for VerifyApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            VerifyApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
            }
            VerifyApiError::Verification(VerificationError::Gateway(err)) => {
                let (status, code) = match err.code {
                    GatewayErrorCode::Timeout => (StatusCode::GATEWAY_TIMEOUT, "GATEWAY_TIMEOUT"),
                    GatewayErrorCode::NotFound => (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND"),
                    GatewayErrorCode::Network
                    | GatewayErrorCode::Unauthorized
                    | GatewayErrorCode::Provider => (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR"),
                };
                (status, code, err.to_string())
            }
            VerifyApiError::Verification(VerificationError::Configuration(message)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "GATEWAY_NOT_CONFIGURED",
                message,
            ),
            VerifyApiError::Verification(VerificationError::Storage(err)) => {
                tracing::error!(error = %err, "Verification storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}
