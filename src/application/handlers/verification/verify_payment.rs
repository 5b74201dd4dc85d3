//! VerifyPaymentHandler - Query handler for pull verification of a payment.
//!
//! Asks the gateway for the current status of a payment, maps it onto the
//! canonical tri-state and cross-checks amount and currency. Gateways
//! without a query API fall back to the stored transaction.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::foundation::{DomainError, Timestamp, TransactionId};
use crate::domain::payment::{
    normalize_currency, to_major_units, Gateway, NativePaymentStatus, PaymentTransaction,
    VerificationStatus,
};
use crate::ports::{GatewayError, GatewayPayment, PaymentStatusQuery, TransactionRepository};

/// A stored verification younger than this is served without a gateway call.
pub const VERIFICATION_FRESHNESS_SECS: i64 = 300;

/// Default bound on the gateway round trip (session plus retrieval).
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);

const PROOF_OF_PAYMENT_HINT: &str =
    "No payment record found; ask the payer to supply proof of payment";

/// Query to verify one payment.
#[derive(Debug, Clone)]
pub struct VerifyPaymentQuery {
    pub transaction_id: TransactionId,
    pub gateway: Gateway,
    pub expected_amount: Option<Decimal>,
    pub expected_currency: Option<String>,
    pub force_refresh: bool,
}

/// Where a verification result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationSource {
    /// Live gateway query.
    Gateway,
    /// Recent verification stored on the transaction.
    Cache,
    /// Stored transaction, for gateways without a query API.
    StoredRecord,
    /// Nothing known about the payment.
    None,
}

/// Result of verifying a payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub transaction_id: TransactionId,
    pub gateway: Gateway,
    pub status: VerificationStatus,
    pub native_status: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub amount_matches: Option<bool>,
    pub currency_matches: Option<bool>,
    pub cached: bool,
    pub source: VerificationSource,
    pub recommendations: Vec<String>,
    pub error_detail: Option<String>,
    pub verified_at: Timestamp,
}

/// Errors that prevent a verification result.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Gateway query failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Storage(DomainError),

    #[error("Verification not configured: {0}")]
    Configuration(String),
}

/// Handler for payment verification queries.
pub struct VerifyPaymentHandler {
    transactions: Arc<dyn TransactionRepository>,
    clients: HashMap<Gateway, Arc<dyn PaymentStatusQuery>>,
    gateway_timeout: Duration,
}

impl VerifyPaymentHandler {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self {
            transactions,
            clients: HashMap::new(),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Registers the status client for its gateway.
    pub fn with_client(mut self, client: Arc<dyn PaymentStatusQuery>) -> Self {
        self.clients.insert(client.gateway(), client);
        self
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub async fn handle(
        &self,
        query: VerifyPaymentQuery,
    ) -> Result<VerificationResult, VerificationError> {
        let now = Timestamp::now();
        let stored = self
            .transactions
            .find(&query.transaction_id)
            .await
            .map_err(VerificationError::Storage)?;

        if !query.gateway.supports_status_query() {
            return Ok(from_stored_record(&query, stored.as_ref(), now));
        }

        if !query.force_refresh {
            if let Some(result) = stored
                .as_ref()
                .and_then(|tx| from_recent_verification(&query, tx, now))
            {
                tracing::debug!(
                    transaction_id = %query.transaction_id,
                    gateway = %query.gateway,
                    "Serving verification from recent result"
                );
                return Ok(result);
            }
        }

        let client = self.clients.get(&query.gateway).ok_or_else(|| {
            VerificationError::Configuration(format!(
                "no status client for {}",
                query.gateway
            ))
        })?;

        let payment = self.retrieve(client.as_ref(), &query).await?;
        let result = from_gateway_payment(&query, stored.as_ref(), payment, now)?;

        if stored.is_some() {
            self.record(&query.transaction_id, result.status, now).await;
        }

        tracing::info!(
            transaction_id = %query.transaction_id,
            gateway = %query.gateway,
            status = result.status.as_str(),
            native_status = result.native_status.as_deref(),
            "Payment verified with gateway"
        );
        Ok(result)
    }

    async fn retrieve(
        &self,
        client: &dyn PaymentStatusQuery,
        query: &VerifyPaymentQuery,
    ) -> Result<GatewayPayment, GatewayError> {
        let call = async {
            let session = client.open_session().await?;
            client
                .retrieve_payment(&session, query.transaction_id.as_str())
                .await
        };

        let result = match tokio::time::timeout(self.gateway_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::timeout(format!(
                "{} did not respond within {}s",
                query.gateway,
                self.gateway_timeout.as_secs()
            ))),
        };

        result.map_err(|err| {
            tracing::warn!(
                transaction_id = %query.transaction_id,
                gateway = %query.gateway,
                code = %err.code,
                "Gateway verification failed"
            );
            err
        })
    }

    async fn record(&self, id: &TransactionId, status: VerificationStatus, at: Timestamp) {
        let call = self.transactions.record_verification(id, status, at);
        match tokio::time::timeout(self.gateway_timeout, call).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                tracing::warn!(transaction_id = %id, error = %err, "Failed to record verification")
            }
            Err(_) => tracing::warn!(transaction_id = %id, "Recording verification timed out"),
        }
    }
}

fn blank_result(query: &VerifyPaymentQuery, now: Timestamp) -> VerificationResult {
    VerificationResult {
        transaction_id: query.transaction_id.clone(),
        gateway: query.gateway,
        status: VerificationStatus::Pending,
        native_status: None,
        amount: None,
        currency: None,
        amount_matches: None,
        currency_matches: None,
        cached: false,
        source: VerificationSource::None,
        recommendations: Vec::new(),
        error_detail: None,
        verified_at: now,
    }
}

fn from_stored_record(
    query: &VerifyPaymentQuery,
    stored: Option<&PaymentTransaction>,
    now: Timestamp,
) -> VerificationResult {
    let mut result = blank_result(query, now);
    let Some(tx) = stored else {
        result.recommendations.push(PROOF_OF_PAYMENT_HINT.to_string());
        return result;
    };

    result.status = tx.verification_status();
    result.native_status = Some(tx.status.as_str().to_string());
    result.amount = Some(tx.amount);
    result.currency = Some(tx.currency.clone());
    result.source = VerificationSource::StoredRecord;
    result.verified_at = tx.updated_at;
    result.recommendations.push(
        match result.status {
            VerificationStatus::Pending => {
                "Transfer not yet confirmed; match it against the payer's proof of payment"
            }
            VerificationStatus::Completed => "Transfer recorded as received; no action needed",
            VerificationStatus::Failed => {
                "Transfer recorded as failed; ask the payer to retry or supply proof of payment"
            }
        }
        .to_string(),
    );
    cross_check(&mut result, query);
    result
}

fn from_recent_verification(
    query: &VerifyPaymentQuery,
    tx: &PaymentTransaction,
    now: Timestamp,
) -> Option<VerificationResult> {
    if tx.gateway != query.gateway {
        return None;
    }
    let status = tx.last_verified_status?;
    let verified_at = tx.last_verified_at?;
    let age = now.duration_since(&verified_at).num_seconds();
    if !(0..VERIFICATION_FRESHNESS_SECS).contains(&age) {
        return None;
    }

    let mut result = blank_result(query, now);
    result.status = status;
    result.amount = Some(tx.amount);
    result.currency = Some(tx.currency.clone());
    result.cached = true;
    result.source = VerificationSource::Cache;
    result.verified_at = verified_at;
    result.recommendations.push(status_hint(status).to_string());
    cross_check(&mut result, query);
    Some(result)
}

fn from_gateway_payment(
    query: &VerifyPaymentQuery,
    stored: Option<&PaymentTransaction>,
    payment: GatewayPayment,
    now: Timestamp,
) -> Result<VerificationResult, VerificationError> {
    let native = NativePaymentStatus::parse(query.gateway, &payment.native_status).ok_or_else(
        || VerificationError::Configuration(format!("{} has no status table", query.gateway)),
    )?;
    if native.is_unrecognized() {
        tracing::warn!(
            transaction_id = %query.transaction_id,
            gateway = %query.gateway,
            native_status = %payment.native_status,
            "Gateway reported an unrecognized payment status"
        );
    }

    let currency = payment
        .currency
        .as_deref()
        .or(stored.map(|tx| tx.currency.as_str()))
        .map(normalize_currency);

    let mut result = blank_result(query, now);
    result.status = native.verification_status();
    result.native_status = Some(native.as_str().to_string());
    result.amount = match (payment.amount_minor, currency.as_deref()) {
        (Some(minor), Some(currency)) => Some(to_major_units(minor, currency)),
        _ => None,
    };
    result.currency = currency;
    result.source = VerificationSource::Gateway;
    result.recommendations.push(native.recommendation().to_string());

    if let Some(message) = payment.error_message.as_deref() {
        result
            .recommendations
            .push(format!("Gateway reported an error: {}", message));
    }
    result.error_detail = match (payment.error_code, payment.error_message) {
        (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
        (Some(code), None) => Some(code),
        (None, message) => message,
    };

    cross_check(&mut result, query);
    Ok(result)
}

fn status_hint(status: VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Pending => "Payment still pending; check again later",
        VerificationStatus::Completed => "Payment completed; no action needed",
        VerificationStatus::Failed => "Payment failed; start a new payment attempt",
    }
}

/// Compares the result against the caller's expectations.
fn cross_check(result: &mut VerificationResult, query: &VerifyPaymentQuery) {
    if let (Some(expected), Some(actual)) = (query.expected_amount, result.amount) {
        let matches = expected == actual;
        result.amount_matches = Some(matches);
        if !matches {
            result.recommendations.push(format!(
                "Amount mismatch: expected {}, found {}",
                expected, actual
            ));
        }
    }

    if let (Some(expected), Some(actual)) = (query.expected_currency.as_deref(), result.currency.as_deref()) {
        let expected = normalize_currency(expected);
        let matches = expected == actual;
        result.currency_matches = Some(matches);
        if !matches {
            result.recommendations.push(format!(
                "Currency mismatch: expected {}, found {}",
                expected, actual
            ));
        }
    }
}
