//! HTTP DTOs for the payment endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::handlers::VerifyPaymentQuery;
use crate::domain::foundation::{TransactionId, ValidationError};
use crate::domain::payment::Gateway;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /payments/verify`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub transaction_id: String,
    pub gateway: String,
    #[serde(default)]
    pub expected_amount: Option<Decimal>,
    #[serde(default)]
    pub expected_currency: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

impl VerifyPaymentRequest {
    /// Validates identifiers and builds the application query.
    pub fn into_query(self) -> Result<VerifyPaymentQuery, ValidationError> {
        let transaction_id = TransactionId::new(self.transaction_id)?;
        let gateway: Gateway = self.gateway.parse()?;
        let expected_currency = match self.expected_currency {
            Some(c) if c.trim().len() != 3 => {
                return Err(ValidationError::invalid_format(
                    "expected_currency",
                    "must be a 3-letter currency code",
                ))
            }
            other => other,
        };

        Ok(VerifyPaymentQuery {
            transaction_id,
            gateway,
            expected_amount: self.expected_amount,
            expected_currency,
            force_refresh: self.force_refresh,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
