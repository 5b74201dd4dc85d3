//! PayPal payment status client.
//!
//! Every verification opens its own OAuth session (`POST /v1/oauth2/token`)
//! and then reads the order (`GET /v2/checkout/orders/{id}`) with the bearer
//! token. Tokens are never cached between calls.

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{to_minor_units, Gateway};
use crate::ports::{GatewayError, GatewayPayment, GatewaySession, PaymentStatusQuery};

/// Default per-request timeout for PayPal API calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
pub const LIVE_BASE_URL: &str = "https://api-m.paypal.com";

/// PayPal REST API configuration.
#[derive(Clone)]
pub struct PayPalConfig {
    client_id: String,
    client_secret: SecretString,
    api_base_url: String,
    request_timeout: Duration,
}

impl PayPalConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            api_base_url: SANDBOX_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// PayPal implementation of `PaymentStatusQuery`.
pub struct PayPalStatusClient {
    config: PayPalConfig,
    http_client: reqwest::Client,
}

impl PayPalStatusClient {
    pub fn new(config: PayPalConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PayPalOrder {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    #[serde(default)]
    amount: Option<PayPalAmount>,
    #[serde(default)]
    payments: Option<PayPalPayments>,
}

#[derive(Debug, Deserialize)]
struct PayPalAmount {
    currency_code: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PayPalPayments {
    #[serde(default)]
    captures: Vec<PayPalCapture>,
}

#[derive(Debug, Deserialize)]
struct PayPalCapture {
    status: String,
    #[serde(default)]
    status_details: Option<StatusDetails>,
}

#[derive(Debug, Deserialize)]
struct StatusDetails {
    reason: String,
}

fn into_payment(raw: serde_json::Value) -> Result<GatewayPayment, GatewayError> {
    let order: PayPalOrder = serde_json::from_value(raw.clone())
        .map_err(|e| GatewayError::provider(format!("Failed to parse PayPal response: {}", e)))?;

    let unit = order.purchase_units.first();
    let amount = unit.and_then(|u| u.amount.as_ref());
    // Once captured, the capture carries the money-movement outcome.
    let capture = unit
        .and_then(|u| u.payments.as_ref())
        .and_then(|p| p.captures.last());

    let amount_minor = match amount {
        Some(a) => {
            let value = Decimal::from_str(&a.value).map_err(|e| {
                GatewayError::provider(format!("Invalid PayPal amount '{}': {}", a.value, e))
            })?;
            Some(to_minor_units(value, &a.currency_code))
        }
        None => None,
    };

    let error_code = capture
        .and_then(|c| c.status_details.as_ref())
        .map(|d| d.reason.clone());

    Ok(GatewayPayment {
        id: order.id,
        native_status: capture
            .map(|c| c.status.clone())
            .unwrap_or(order.status),
        amount_minor,
        currency: amount.map(|a| a.currency_code.clone()),
        error_message: error_code
            .as_ref()
            .map(|reason| format!("Capture held by PayPal: {}", reason)),
        error_code,
        raw,
    })
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::timeout(format!("PayPal request timed out: {}", e))
    } else {
        GatewayError::network(e.to_string())
    }
}

#[async_trait]
impl PaymentStatusQuery for PayPalStatusClient {
    fn gateway(&self) -> Gateway {
        Gateway::PayPal
    }

    async fn open_session(&self) -> Result<GatewaySession, GatewayError> {
        let url = format!("{}/v1/oauth2/token", self.config.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(self.config.client_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::unauthorized("PayPal rejected the client credentials"));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::provider(format!(
                "PayPal token error ({}): {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse PayPal token response: {}", e))
        })?;

        let expires_at = token
            .expires_in
            .map(|secs| Timestamp::now().plus_secs(secs));
        Ok(GatewaySession::new(
            SecretString::new(token.access_token),
            expires_at,
        ))
    }

    async fn retrieve_payment(
        &self,
        session: &GatewaySession,
        payment_id: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        if session.is_expired(Timestamp::now()) {
            return Err(GatewayError::unauthorized("PayPal session expired"));
        }

        let url = format!(
            "{}/v2/checkout/orders/{}",
            self.config.api_base_url, payment_id
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(session.token().expose_secret())
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => return Err(GatewayError::not_found("PayPal order")),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(GatewayError::unauthorized("PayPal rejected the access token"))
            }
            status if !status.is_success() => {
                let error_text = response.text().await.unwrap_or_default();
                return Err(GatewayError::provider(format!(
                    "PayPal API error ({}): {}",
                    status, error_text
                )));
            }
            _ => {}
        }

        let raw: serde_json::Value = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse PayPal response: {}", e))
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
    use axum::routing::{get, post};
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

    async fn token(headers: HeaderMap) -> Result<Json<serde_json::Value>, StatusCode> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !auth.starts_with("Basic ") {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(Json(json!({"access_token": "A21AA-token", "expires_in": 32400})))
    }

    async fn order(
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if auth != "Bearer A21AA-token" {
            return Err(StatusCode::UNAUTHORIZED);
        }
        match id.as_str() {
            "ORDER-1" => Ok(Json(json!({
                "id": "ORDER-1",
                "status": "COMPLETED",
                "purchase_units": [{
                    "amount": {"currency_code": "USD", "value": "10.50"},
                    "payments": {"captures": [{"status": "COMPLETED"}]}
                }]
            }))),
            "ORDER-2" => Ok(Json(json!({
                "id": "ORDER-2",
                "status": "APPROVED",
                "purchase_units": [{"amount": {"currency_code": "JPY", "value": "5000"}}]
            }))),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    async fn client() -> PayPalStatusClient {
        let base = serve(
            Router::new()
                .route("/v1/oauth2/token", post(token))
                .route("/v2/checkout/orders/:id", get(order)),
        )
        .await;
        PayPalStatusClient::new(PayPalConfig::new("client", "secret").with_base_url(base))
    }

    #[test]
    fn capture_status_and_reason_take_precedence() {
        let payment = into_payment(json!({
            "id": "ORDER-9",
            "status": "COMPLETED",
            "purchase_units": [{
                "amount": {"currency_code": "USD", "value": "1.00"},
                "payments": {"captures": [{"status": "PENDING",
                                           "status_details": {"reason": "PENDING_REVIEW"}}]}
            }]
        }))
        .unwrap();

        assert_eq!(payment.native_status, "PENDING");
        assert_eq!(payment.error_code.as_deref(), Some("PENDING_REVIEW"));
        assert_eq!(payment.amount_minor, Some(100));
    }

    #[tokio::test]
    async fn opens_session_with_expiry() {
        let client = client().await;

        let session = client.open_session().await.unwrap();

        assert_eq!(session.token().expose_secret(), "A21AA-token");
        assert!(!session.is_expired(Timestamp::now()));
    }

    #[tokio::test]
    async fn retrieves_order_and_converts_amount() {
        let client = client().await;
        let session = client.open_session().await.unwrap();

        let completed = client.retrieve_payment(&session, "ORDER-1").await.unwrap();
        assert_eq!(completed.native_status, "COMPLETED");
        assert_eq!(completed.amount_minor, Some(1050));

        let approved = client.retrieve_payment(&session, "ORDER-2").await.unwrap();
        assert_eq!(approved.native_status, "APPROVED");
        assert_eq!(approved.amount_minor, Some(5000));
    }

    #[tokio::test]
    async fn expired_session_is_rejected_without_a_call() {
        let client = PayPalStatusClient::new(
            PayPalConfig::new("client", "secret").with_base_url("http://127.0.0.1:9"),
        );
        let session = GatewaySession::new(
            SecretString::new("stale".to_string()),
            Some(Timestamp::now().minus_secs(1)),
        );

        let err = client.retrieve_payment(&session, "ORDER-1").await.unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let client = client().await;
        let session = client.open_session().await.unwrap();

        let err = client.retrieve_payment(&session, "ORDER-404").await.unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::NotFound);
    }
}
