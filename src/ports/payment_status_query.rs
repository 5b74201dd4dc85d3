//! PaymentStatusQuery port - "Retrieve payment status by id" at a gateway.
//!
//! Credentials are carried in an explicit [`GatewaySession`] value that the
//! caller opens, threads through its calls and drops. Nothing is cached
//! process-wide.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::Gateway;

/// Seconds before expiry at which a session is treated as expired.
const SESSION_EXPIRY_MARGIN_SECS: i64 = 30;

/// Short-lived credential for talking to a gateway API.
#[derive(Clone)]
pub struct GatewaySession {
    token: SecretString,
    expires_at: Option<Timestamp>,
}

impl GatewaySession {
    /// A session with a bearer token that expires at `expires_at`.
    pub fn new(token: SecretString, expires_at: Option<Timestamp>) -> Self {
        Self { token, expires_at }
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// True when the session must be reopened before use.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(expires_at) => !now.plus_secs(SESSION_EXPIRY_MARGIN_SECS).is_before(&expires_at),
            None => false,
        }
    }
}

impl std::fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Payment as reported by a gateway query API.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub id: String,
    /// Status in the gateway's own vocabulary.
    pub native_status: String,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub raw: serde_json::Value,
}

/// Category of a gateway query failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorCode {
    Timeout,
    Network,
    NotFound,
    Unauthorized,
    Provider,
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::Network => "network",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::Unauthorized => "unauthorized",
            GatewayErrorCode::Provider => "provider",
        };
        f.write_str(s)
    }
}

/// Failure talking to a gateway API.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Network, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Unauthorized, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Provider, message)
    }
}

/// Port for querying payment status at one gateway.
#[async_trait]
pub trait PaymentStatusQuery: Send + Sync {
    /// Gateway this client talks to.
    fn gateway(&self) -> Gateway;

    /// Open a short-lived session for subsequent calls.
    async fn open_session(&self) -> Result<GatewaySession, GatewayError>;

    /// Retrieve a payment by its gateway id.
    async fn retrieve_payment(
        &self,
        session: &GatewaySession,
        payment_id: &str,
    ) -> Result<GatewayPayment, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_without_expiry_never_expires() {
        let session = GatewaySession::new(SecretString::new("sk".to_string()), None);
        assert!(!session.is_expired(Timestamp::now()));
    }

    #[test]
    fn session_expires_inside_margin() {
        let now = Timestamp::from_unix_secs(1_700_000_000).unwrap();
        let session = GatewaySession::new(
            SecretString::new("token".to_string()),
            Some(now.plus_secs(10)),
        );

        assert!(session.is_expired(now));
        assert!(!GatewaySession::new(
            SecretString::new("token".to_string()),
            Some(now.plus_secs(3600))
        )
        .is_expired(now));
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = GatewaySession::new(SecretString::new("A21AA-secret".to_string()), None);
        assert!(!format!("{:?}", session).contains("A21AA"));
    }

    #[test]
    fn gateway_error_displays_code() {
        let err = GatewayError::not_found("payment pi_1");
        assert_eq!(err.to_string(), "not_found: payment pi_1 not found");
    }
}
