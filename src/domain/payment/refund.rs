//! Refund ledger record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, TransactionId, ValidationError};

use super::money::normalize_currency;

/// Outcome of a gateway refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Succeeded,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Succeeded => "succeeded",
            RefundStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "succeeded" => Ok(RefundStatus::Succeeded),
            "failed" => Ok(RefundStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "refund_status",
                format!("unknown refund status '{}'", other),
            )),
        }
    }
}

/// One refund reported by a gateway. Upserted by refund id, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub refund_id: String,
    pub transaction_id: TransactionId,
    pub amount: Decimal,
    pub currency: String,
    pub status: RefundStatus,
    pub reason: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Refund {
    /// Creates a refund record, validating the gateway refund id.
    pub fn new(
        refund_id: impl Into<String>,
        transaction_id: TransactionId,
        amount: Decimal,
        currency: &str,
        status: RefundStatus,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let refund_id = refund_id.into();
        if refund_id.trim().is_empty() {
            return Err(ValidationError::empty_field("refund_id"));
        }
        Ok(Self {
            refund_id,
            transaction_id,
            amount,
            currency: normalize_currency(currency),
            status,
            reason: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_failure_reason(mut self, failure_reason: Option<String>) -> Self {
        self.failure_reason = failure_reason;
        self
    }

    /// Folds a newer report of the same refund into this record.
    ///
    /// `created_at` is preserved; everything else takes the newer values.
    pub fn merge(&mut self, newer: Refund) {
        self.amount = newer.amount;
        self.currency = newer.currency;
        self.status = newer.status;
        if newer.reason.is_some() {
            self.reason = newer.reason;
        }
        self.failure_reason = newer.failure_reason;
        self.updated_at = newer.updated_at;
    }
}
