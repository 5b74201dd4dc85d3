//! Stripe payment status client.
//!
//! Implements `PaymentStatusQuery` against `GET /v1/payment_intents/{id}`,
//! authenticating with the secret API key over HTTP basic auth.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::payment::Gateway;
use crate::ports::{GatewayError, GatewayPayment, GatewaySession, PaymentStatusQuery};

/// Default per-request timeout for Stripe API calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    request_timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Stripe implementation of `PaymentStatusQuery`.
pub struct StripeStatusClient {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeStatusClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    status: String,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    last_payment_error: Option<StripePaymentError>,
}

#[derive(Debug, Deserialize)]
struct StripePaymentError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn into_payment(raw: serde_json::Value) -> Result<GatewayPayment, GatewayError> {
    let intent: StripePaymentIntent = serde_json::from_value(raw.clone())
        .map_err(|e| GatewayError::provider(format!("Failed to parse Stripe response: {}", e)))?;
    let (error_code, error_message) = match intent.last_payment_error {
        Some(err) => (err.decline_code.or(err.code), err.message),
        None => (None, None),
    };

    Ok(GatewayPayment {
        id: intent.id,
        native_status: intent.status,
        amount_minor: intent.amount,
        currency: intent.currency,
        error_code,
        error_message,
        raw,
    })
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::timeout(format!("Stripe request timed out: {}", e))
    } else {
        GatewayError::network(e.to_string())
    }
}

#[async_trait]
impl PaymentStatusQuery for StripeStatusClient {
    fn gateway(&self) -> Gateway {
        Gateway::Stripe
    }

    async fn open_session(&self) -> Result<GatewaySession, GatewayError> {
        // Secret keys do not expire; the session just carries the key.
        Ok(GatewaySession::new(self.config.api_key.clone(), None))
    }

    async fn retrieve_payment(
        &self,
        session: &GatewaySession,
        payment_id: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let url = format!(
            "{}/v1/payment_intents/{}",
            self.config.api_base_url, payment_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(session.token().expose_secret(), Option::<&str>::None)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => return Err(GatewayError::not_found("Payment intent")),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(GatewayError::unauthorized("Stripe rejected the API key"))
            }
            status if !status.is_success() => {
                let error_text = response.text().await.unwrap_or_default();
                return Err(GatewayError::provider(format!(
                    "Stripe API error ({}): {}",
                    status, error_text
                )));
            }
            _ => {}
        }

        let raw: serde_json::Value = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;
        into_payment(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayErrorCode;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn payment_intent(
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        if !headers.contains_key("authorization") {
            return Err(StatusCode::UNAUTHORIZED);
        }
        match id.as_str() {
            "pi_ok" => Ok(Json(json!({
                "id": "pi_ok", "status": "succeeded", "amount": 1050, "currency": "usd"
            }))),
            "pi_declined" => Ok(Json(json!({
                "id": "pi_declined", "status": "requires_payment_method", "amount": 1050,
                "currency": "usd",
                "last_payment_error": {"code": "card_declined", "decline_code": "insufficient_funds",
                                       "message": "Your card has insufficient funds."}
            }))),
            "pi_forbidden" => Err(StatusCode::UNAUTHORIZED),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    async fn client() -> StripeStatusClient {
        let base = serve(Router::new().route("/v1/payment_intents/:id", get(payment_intent))).await;
        StripeStatusClient::new(StripeConfig::new("sk_test_123").with_base_url(base))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        let config = StripeConfig::new("sk_test");
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn into_payment_prefers_decline_code() {
        let payment = into_payment(json!({
            "id": "pi_1", "status": "requires_payment_method",
            "last_payment_error": {"code": "card_declined", "decline_code": "lost_card"}
        }))
        .unwrap();
        assert_eq!(payment.error_code.as_deref(), Some("lost_card"));
        assert_eq!(payment.amount_minor, None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // API Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn retrieves_payment_intent() {
        let client = client().await;
        let session = client.open_session().await.unwrap();

        let payment = client.retrieve_payment(&session, "pi_ok").await.unwrap();

        assert_eq!(payment.native_status, "succeeded");
        assert_eq!(payment.amount_minor, Some(1050));
        assert_eq!(payment.currency.as_deref(), Some("usd"));
    }

    #[tokio::test]
    async fn surfaces_last_payment_error() {
        let client = client().await;
        let session = client.open_session().await.unwrap();

        let payment = client.retrieve_payment(&session, "pi_declined").await.unwrap();

        assert_eq!(payment.error_code.as_deref(), Some("insufficient_funds"));
        assert_eq!(
            payment.error_message.as_deref(),
            Some("Your card has insufficient funds.")
        );
    }

    #[tokio::test]
    async fn maps_http_errors() {
        let client = client().await;
        let session = client.open_session().await.unwrap();

        let missing = client.retrieve_payment(&session, "pi_missing").await.unwrap_err();
        assert_eq!(missing.code, GatewayErrorCode::NotFound);

        let denied = client.retrieve_payment(&session, "pi_forbidden").await.unwrap_err();
        assert_eq!(denied.code, GatewayErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let client = StripeStatusClient::new(
            StripeConfig::new("sk_test").with_base_url("http://127.0.0.1:9"),
        );
        let session = client.open_session().await.unwrap();

        let err = client.retrieve_payment(&session, "pi_1").await.unwrap_err();

        assert!(matches!(
            err.code,
            GatewayErrorCode::Network | GatewayErrorCode::Timeout
        ));
    }
}
