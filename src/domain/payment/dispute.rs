//! Dispute (chargeback) ledger record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, Timestamp, TransactionId, ValidationError};

use super::money::normalize_currency;

/// Canonical dispute status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    NeedsResponse,
    UnderReview,
    Won,
    Lost,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::NeedsResponse => "needs_response",
            DisputeStatus::UnderReview => "under_review",
            DisputeStatus::Won => "won",
            DisputeStatus::Lost => "lost",
        }
    }

    /// Maps a gateway dispute status onto the canonical vocabulary.
    ///
    /// Unknown strings are rejected rather than passed through.
    pub fn from_gateway(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "needs_response" | "warning_needs_response" | "open" | "waiting_for_seller_response" => {
                Ok(DisputeStatus::NeedsResponse)
            }
            "under_review" | "warning_under_review" => Ok(DisputeStatus::UnderReview),
            "won" | "warning_closed" | "resolved_seller_favour" => Ok(DisputeStatus::Won),
            "lost" | "resolved_buyer_favour" => Ok(DisputeStatus::Lost),
            other => Err(ValidationError::invalid_format(
                "dispute_status",
                format!("unknown dispute status '{}'", other),
            )),
        }
    }
}

impl StateMachine for DisputeStatus {
    fn label(&self) -> &'static str {
        self.as_str()
    }

    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(self, DisputeStatus::NeedsResponse | DisputeStatus::UnderReview)
            || self == target
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use DisputeStatus::*;
        match self {
            NeedsResponse | UnderReview => vec![NeedsResponse, UnderReview, Won, Lost],
            Won | Lost => vec![],
        }
    }
}

/// One chargeback raised against a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub dispute_id: String,
    pub transaction_id: TransactionId,
    pub amount: Decimal,
    pub currency: String,
    pub status: DisputeStatus,
    pub reason: Option<String>,
    pub evidence_due_by: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Dispute {
    pub fn new(
        dispute_id: impl Into<String>,
        transaction_id: TransactionId,
        amount: Decimal,
        currency: &str,
        status: DisputeStatus,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let dispute_id = dispute_id.into();
        if dispute_id.trim().is_empty() {
            return Err(ValidationError::empty_field("dispute_id"));
        }
        Ok(Self {
            dispute_id,
            transaction_id,
            amount,
            currency: normalize_currency(currency),
            status,
            reason: None,
            evidence_due_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_evidence_due_by(mut self, due_by: Option<Timestamp>) -> Self {
        self.evidence_due_by = due_by;
        self
    }

    /// Folds a newer report of the same dispute into this record.
    ///
    /// A closed dispute keeps its outcome; returns false when the newer
    /// status was discarded as stale.
    pub fn merge(&mut self, newer: Dispute) -> bool {
        let accepted = self.status.can_transition_to(&newer.status);
        if accepted {
            self.status = newer.status;
        }
        self.amount = newer.amount;
        self.currency = newer.currency;
        if newer.reason.is_some() {
            self.reason = newer.reason;
        }
        if newer.evidence_due_by.is_some() {
            self.evidence_due_by = newer.evidence_due_by;
        }
        self.updated_at = newer.updated_at;
        accepted
    }
}
