//! Reconciliation results and errors.

use serde::Serialize;
use thiserror::Error;

use crate::domain::foundation::{DomainError, TransactionId};

/// Result of applying one event. Never an `Err`; failures are data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReconciliationOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Reasons an event could not be applied. Converted to a failed
/// [`ReconciliationOutcome`] at the engine boundary.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// The event names a transaction that is not stored here.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The event's content cannot be applied (e.g. unknown dispute status).
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// A port call failed.
    #[error("{operation} failed: {source}")]
    Port {
        operation: &'static str,
        #[source]
        source: DomainError,
    },

    /// A port call did not finish within the engine's bound.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// A handler panicked.
    #[error("Internal error while applying event")]
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_message() {
        let outcome = ReconciliationOutcome::failure("Transaction not found: tx_unknown");
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Transaction not found: tx_unknown"));
    }

    #[test]
    fn success_serializes_without_error_field() {
        let json = serde_json::to_value(ReconciliationOutcome::success()).unwrap();
        assert_eq!(json, serde_json::json!({"success": true}));
    }

    #[test]
    fn not_found_names_the_transaction() {
        let err = ReconciliationError::TransactionNotFound(TransactionId::new("tx_unknown").unwrap());
        assert_eq!(err.to_string(), "Transaction not found: tx_unknown");
    }

    #[test]
    fn port_error_names_operation() {
        let err = ReconciliationError::Port {
            operation: "apply_refund",
            source: DomainError::database("connection reset"),
        };
        assert_eq!(
            err.to_string(),
            "apply_refund failed: [DATABASE_ERROR] connection reset"
        );
    }
}
