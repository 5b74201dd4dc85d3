//! Webhook ingress errors.
//!
//! Only failures that stop a delivery before any financial state is touched
//! live here. Once a signature is accepted, reconciliation problems are
//! reported as data in a 200 response instead.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that short-circuit webhook ingress.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhooks are only delivered with POST.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// No signature header was present.
    #[error("Missing signature header")]
    MissingSignature,

    /// Gateway configuration is absent or unreadable.
    #[error("Webhook configuration error: {0}")]
    Configuration(String),

    /// No webhook secret is configured for the gateway's active mode.
    #[error("No webhook secret configured for {gateway} in {mode} mode")]
    MissingSecret { gateway: String, mode: String },

    /// Signature, digest or timestamp check failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is not a well-formed event envelope.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl WebhookError {
    /// Maps the error to an HTTP status code.
    ///
    /// 4xx tells the gateway not to retry; 5xx asks it to redeliver once an
    /// operator has fixed the configuration.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::Configuration(_) | WebhookError::MissingSecret { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns true if the gateway should redeliver.
    pub fn is_retryable(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Message safe to return to the caller.
    ///
    /// Authentication failures stay generic; configuration failures never
    /// carry configured values.
    pub fn public_message(&self) -> &'static str {
        match self {
            WebhookError::MethodNotAllowed => "method not allowed",
            WebhookError::MissingSignature => "missing signature",
            WebhookError::InvalidSignature => "invalid signature",
            WebhookError::MalformedPayload(_) => "malformed payload",
            WebhookError::Configuration(_) | WebhookError::MissingSecret { .. } => {
                "webhook configuration error"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Status Code Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn method_not_allowed_returns_405() {
        assert_eq!(
            WebhookError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn transport_and_auth_failures_return_400() {
        for err in [
            WebhookError::MissingSignature,
            WebhookError::InvalidSignature,
            WebhookError::MalformedPayload("expected value".to_string()),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn configuration_failures_return_500_and_are_retryable() {
        let err = WebhookError::MissingSecret {
            gateway: "stripe".to_string(),
            mode: "live".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    // ══════════════════════════════════════════════════════════════
    // Display Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn public_message_is_generic() {
        let err = WebhookError::MalformedPayload("missing field `id` at line 1".to_string());
        assert_eq!(err.public_message(), "malformed payload");
        assert_eq!(WebhookError::InvalidSignature.public_message(), "invalid signature");
    }

    #[test]
    fn missing_secret_displays_gateway_and_mode() {
        let err = WebhookError::MissingSecret {
            gateway: "paypal".to_string(),
            mode: "test".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No webhook secret configured for paypal in test mode"
        );
    }
}
