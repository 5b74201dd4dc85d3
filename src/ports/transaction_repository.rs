//! TransactionRepository port - Canonical payment transaction storage.
//!
//! Every mutation is a single storage operation so concurrent deliveries for
//! the same transaction cannot lose updates. In particular `apply_refund`
//! must be an atomic conditional increment, never a read followed by a
//! separate write.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::foundation::{DomainError, OrderId, Timestamp, TransactionId};
use crate::domain::payment::{
    FailureStatus, PaymentTransaction, RefundApplication, VerificationStatus,
};

/// Port for reading and mutating payment transactions.
///
/// Mutations return `Ok(None)` / `Ok(false)` when the transaction does not
/// exist; callers decide whether that is a failure.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Find a transaction by its gateway id.
    async fn find(&self, id: &TransactionId) -> Result<Option<PaymentTransaction>, DomainError>;

    /// Insert or replace a transaction.
    async fn save(&self, transaction: &PaymentTransaction) -> Result<(), DomainError>;

    /// Mark a transaction completed and link the given orders.
    ///
    /// Refund-derived statuses are left as they are.
    async fn mark_completed(
        &self,
        id: &TransactionId,
        order_ids: &[OrderId],
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Option<PaymentTransaction>, DomainError>;

    /// Mark a transaction failed or cancelled and release its linked orders.
    ///
    /// Returns the released order ids. Fails with
    /// `ErrorCode::InvalidStateTransition` once the payment has settled.
    async fn mark_failed(
        &self,
        id: &TransactionId,
        outcome: FailureStatus,
        reason: Option<String>,
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Option<Vec<OrderId>>, DomainError>;

    /// Atomically add a refund to the running refunded total.
    ///
    /// Idempotent per `refund_id`; the total is clamped at the transaction
    /// amount and the status is derived from it.
    async fn apply_refund(
        &self,
        id: &TransactionId,
        refund_id: &str,
        amount: Decimal,
    ) -> Result<Option<RefundApplication>, DomainError>;

    /// Set or clear the open-dispute flag.
    async fn set_dispute_flag(&self, id: &TransactionId, has_dispute: bool)
        -> Result<bool, DomainError>;

    /// Stamp the result of a pull verification. Never changes `status`.
    async fn record_verification(
        &self,
        id: &TransactionId,
        status: VerificationStatus,
        verified_at: Timestamp,
    ) -> Result<bool, DomainError>;
}
