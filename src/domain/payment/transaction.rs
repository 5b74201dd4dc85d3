//! PaymentTransaction aggregate.
//!
//! One record per payment attempt. `status` is a cached projection of the
//! gateway outcome plus `refunded_amount` versus `amount`; refunds only ever
//! grow `refunded_amount`, which never exceeds `amount`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    OrderId, StateMachine, Timestamp, TransactionId, ValidationError,
};

use super::gateway::Gateway;
use super::gateway_status::VerificationStatus;
use super::money::normalize_currency;

/// Lifecycle status of a payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    PartiallyRefunded,
}

impl TransactionStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            "refunded" => Ok(TransactionStatus::Refunded),
            "partially_refunded" => Ok(TransactionStatus::PartiallyRefunded),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown transaction status '{}'", other),
            )),
        }
    }

    /// True once money has moved to the merchant.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed
                | TransactionStatus::PartiallyRefunded
                | TransactionStatus::Refunded
        )
    }

    /// True for statuses derived from the refunded amount.
    pub fn is_refund_derived(&self) -> bool {
        matches!(
            self,
            TransactionStatus::PartiallyRefunded | TransactionStatus::Refunded
        )
    }

    /// Derives the refund status from the running refunded total.
    pub fn from_refunded(refunded_amount: Decimal, amount: Decimal) -> Self {
        if refunded_amount >= amount {
            TransactionStatus::Refunded
        } else {
            TransactionStatus::PartiallyRefunded
        }
    }
}

impl StateMachine for TransactionStatus {
    fn label(&self) -> &'static str {
        self.as_str()
    }

    fn can_transition_to(&self, target: &Self) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, target),
            (Pending | Failed | Cancelled, Completed | Failed | Cancelled)
                | (Completed, Completed | PartiallyRefunded | Refunded)
                | (PartiallyRefunded, PartiallyRefunded | Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Pending | Failed | Cancelled => vec![Completed, Failed, Cancelled],
            Completed => vec![Completed, PartiallyRefunded, Refunded],
            PartiallyRefunded => vec![PartiallyRefunded, Refunded],
            Refunded => vec![],
        }
    }
}

/// Terminal failure outcomes reported by a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStatus {
    Failed,
    Cancelled,
}

impl From<FailureStatus> for TransactionStatus {
    fn from(status: FailureStatus) -> Self {
        match status {
            FailureStatus::Failed => TransactionStatus::Failed,
            FailureStatus::Cancelled => TransactionStatus::Cancelled,
        }
    }
}

/// Result of applying a refund to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundApplication {
    /// False when the refund id had already been applied.
    pub applied: bool,
    /// Running refunded total after the operation.
    pub refunded_amount: Decimal,
    /// Transaction status after the operation.
    pub status: TransactionStatus,
    /// True when the refund would have pushed the total past `amount`.
    pub capped: bool,
}

/// A single payment attempt at a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub transaction_id: TransactionId,
    pub gateway: Gateway,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub refunded_amount: Decimal,
    pub has_dispute: bool,
    pub associated_order_ids: Vec<OrderId>,
    pub gateway_response: Option<serde_json::Value>,
    pub failure_reason: Option<String>,
    /// Gateway refund ids already folded into `refunded_amount`.
    pub applied_refund_ids: Vec<String>,
    pub last_verified_status: Option<VerificationStatus>,
    pub last_verified_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PaymentTransaction {
    /// Creates a pending transaction.
    pub fn new(
        transaction_id: TransactionId,
        gateway: Gateway,
        amount: Decimal,
        currency: &str,
        now: Timestamp,
    ) -> Self {
        Self {
            transaction_id,
            gateway,
            amount,
            currency: normalize_currency(currency),
            status: TransactionStatus::Pending,
            refunded_amount: Decimal::ZERO,
            has_dispute: false,
            associated_order_ids: Vec::new(),
            gateway_response: None,
            failure_reason: None,
            applied_refund_ids: Vec::new(),
            last_verified_status: None,
            last_verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Links orders to this transaction, preserving order and skipping duplicates.
    pub fn link_orders(&mut self, order_ids: &[OrderId]) {
        for order_id in order_ids {
            if !self.associated_order_ids.contains(order_id) {
                self.associated_order_ids.push(order_id.clone());
            }
        }
    }

    /// Records a successful payment.
    ///
    /// Refund-derived statuses are kept so a redelivered success event
    /// cannot undo refunds.
    pub fn complete(
        &mut self,
        order_ids: &[OrderId],
        gateway_response: Option<serde_json::Value>,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        if !self.status.is_refund_derived() {
            self.status = self.status.transition_to(TransactionStatus::Completed)?;
            self.failure_reason = None;
        }
        self.link_orders(order_ids);
        if gateway_response.is_some() {
            self.gateway_response = gateway_response;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Records a failed or cancelled payment.
    ///
    /// Returns the orders that were reserved against this transaction; the
    /// linkage is cleared so a new attempt can claim them.
    pub fn fail(
        &mut self,
        outcome: FailureStatus,
        reason: Option<String>,
        gateway_response: Option<serde_json::Value>,
        now: Timestamp,
    ) -> Result<Vec<OrderId>, ValidationError> {
        self.status = self.status.transition_to(outcome.into())?;
        self.failure_reason = reason;
        if gateway_response.is_some() {
            self.gateway_response = gateway_response;
        }
        self.updated_at = now;
        Ok(std::mem::take(&mut self.associated_order_ids))
    }

    /// Folds a gateway refund into the running refunded total.
    pub fn apply_refund(
        &mut self,
        refund_id: &str,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<RefundApplication, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::not_positive("refund_amount"));
        }
        if refund_id.trim().is_empty() {
            return Err(ValidationError::empty_field("refund_id"));
        }

        if self.applied_refund_ids.iter().any(|id| id == refund_id) {
            return Ok(RefundApplication {
                applied: false,
                refunded_amount: self.refunded_amount,
                status: self.status,
                capped: false,
            });
        }

        let uncapped = self.refunded_amount + amount;
        let capped = uncapped > self.amount;
        self.refunded_amount = uncapped.min(self.amount);
        self.status = TransactionStatus::from_refunded(self.refunded_amount, self.amount);
        self.applied_refund_ids.push(refund_id.to_string());
        self.updated_at = now;

        Ok(RefundApplication {
            applied: true,
            refunded_amount: self.refunded_amount,
            status: self.status,
            capped,
        })
    }

    /// Flags an open dispute.
    pub fn open_dispute(&mut self, now: Timestamp) {
        self.has_dispute = true;
        self.updated_at = now;
    }

    /// Clears the dispute flag once a dispute reaches a terminal status.
    pub fn resolve_dispute(&mut self, now: Timestamp) {
        self.has_dispute = false;
        self.updated_at = now;
    }

    /// Stamps the most recent pull verification. Never touches `status`.
    pub fn record_verification(&mut self, status: VerificationStatus, at: Timestamp) {
        self.last_verified_status = Some(status);
        self.last_verified_at = Some(at);
    }

    /// Canonical tri-state view of the stored status.
    pub fn verification_status(&self) -> VerificationStatus {
        match self.status {
            TransactionStatus::Pending => VerificationStatus::Pending,
            TransactionStatus::Failed | TransactionStatus::Cancelled => VerificationStatus::Failed,
            TransactionStatus::Completed
            | TransactionStatus::PartiallyRefunded
            | TransactionStatus::Refunded => VerificationStatus::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(amount: Decimal) -> PaymentTransaction {
        PaymentTransaction::new(
            TransactionId::new("pi_123").unwrap(),
            Gateway::Stripe,
            amount,
            "usd",
            Timestamp::now(),
        )
    }

    fn order(id: &str) -> OrderId {
        OrderId::new(id).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Status Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Cancelled,
            TransactionStatus::Refunded,
            TransactionStatus::PartiallyRefunded,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(TransactionStatus::parse("settled").is_err());
    }

    #[test]
    fn refunded_is_terminal() {
        assert!(TransactionStatus::Refunded.is_terminal());
        assert!(!TransactionStatus::Completed.is_terminal());
    }

    #[test]
    fn new_transaction_is_pending_with_normalized_currency() {
        let tx = tx(dec!(10));
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.currency, "USD");
        assert_eq!(tx.refunded_amount, Decimal::ZERO);
    }

    // ══════════════════════════════════════════════════════════════
    // Completion / Failure Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn complete_links_orders_without_duplicates() {
        let mut tx = tx(dec!(10));
        tx.link_orders(&[order("q1")]);

        tx.complete(&[order("q1"), order("q2")], None, Timestamp::now())
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.associated_order_ids, vec![order("q1"), order("q2")]);
    }

    #[test]
    fn complete_after_failure_clears_reason() {
        let mut tx = tx(dec!(10));
        tx.fail(FailureStatus::Failed, Some("card_declined".into()), None, Timestamp::now())
            .unwrap();

        tx.complete(&[], None, Timestamp::now()).unwrap();

        assert_eq!(tx.status, TransactionStatus::Completed);
        assert!(tx.failure_reason.is_none());
    }

    #[test]
    fn redelivered_success_does_not_undo_refund() {
        let mut tx = tx(dec!(10));
        tx.complete(&[], None, Timestamp::now()).unwrap();
        tx.apply_refund("re_1", dec!(4), Timestamp::now()).unwrap();

        tx.complete(&[], None, Timestamp::now()).unwrap();

        assert_eq!(tx.status, TransactionStatus::PartiallyRefunded);
    }

    #[test]
    fn fail_releases_linked_orders() {
        let mut tx = tx(dec!(10));
        tx.link_orders(&[order("q1"), order("q2")]);

        let released = tx
            .fail(FailureStatus::Cancelled, Some("abandoned".into()), None, Timestamp::now())
            .unwrap();

        assert_eq!(released, vec![order("q1"), order("q2")]);
        assert!(tx.associated_order_ids.is_empty());
        assert_eq!(tx.status, TransactionStatus::Cancelled);
        assert_eq!(tx.failure_reason.as_deref(), Some("abandoned"));
    }

    #[test]
    fn fail_after_settlement_is_rejected() {
        let mut tx = tx(dec!(10));
        tx.complete(&[], None, Timestamp::now()).unwrap();

        let result = tx.fail(FailureStatus::Failed, None, None, Timestamp::now());

        assert!(result.is_err());
        assert_eq!(tx.status, TransactionStatus::Completed);
    }

    // ══════════════════════════════════════════════════════════════
    // Refund Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn two_half_refunds_fully_refund() {
        let mut tx = tx(dec!(100.50));
        tx.complete(&[], None, Timestamp::now()).unwrap();

        let first = tx.apply_refund("re_1", dec!(50.25), Timestamp::now()).unwrap();
        assert_eq!(first.status, TransactionStatus::PartiallyRefunded);
        assert_eq!(first.refunded_amount, dec!(50.25));

        let second = tx.apply_refund("re_2", dec!(50.25), Timestamp::now()).unwrap();
        assert_eq!(second.status, TransactionStatus::Refunded);
        assert_eq!(second.refunded_amount, dec!(100.50));
    }

    #[test]
    fn same_refund_id_is_applied_once() {
        let mut tx = tx(dec!(10));

        tx.apply_refund("re_1", dec!(3), Timestamp::now()).unwrap();
        let again = tx.apply_refund("re_1", dec!(3), Timestamp::now()).unwrap();

        assert!(!again.applied);
        assert_eq!(tx.refunded_amount, dec!(3));
    }

    #[test]
    fn over_refund_is_capped_at_amount() {
        let mut tx = tx(dec!(10));

        let result = tx.apply_refund("re_1", dec!(12), Timestamp::now()).unwrap();

        assert!(result.capped);
        assert_eq!(tx.refunded_amount, dec!(10));
        assert_eq!(tx.status, TransactionStatus::Refunded);
    }

    #[test]
    fn non_positive_refund_is_rejected() {
        let mut tx = tx(dec!(10));
        assert!(tx.apply_refund("re_1", dec!(0), Timestamp::now()).is_err());
        assert!(tx.apply_refund("re_2", dec!(-1), Timestamp::now()).is_err());
        assert_eq!(tx.refunded_amount, Decimal::ZERO);
    }

    // ══════════════════════════════════════════════════════════════
    // Dispute / Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn dispute_flag_toggles() {
        let mut tx = tx(dec!(10));
        tx.open_dispute(Timestamp::now());
        assert!(tx.has_dispute);
        tx.resolve_dispute(Timestamp::now());
        assert!(!tx.has_dispute);
    }

    #[test]
    fn record_verification_leaves_status_alone() {
        let mut tx = tx(dec!(10));
        tx.record_verification(VerificationStatus::Completed, Timestamp::now());

        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.last_verified_status, Some(VerificationStatus::Completed));
    }

    #[test]
    fn verification_status_collapses_refund_states() {
        let mut tx = tx(dec!(10));
        tx.apply_refund("re_1", dec!(1), Timestamp::now()).unwrap();
        assert_eq!(tx.verification_status(), VerificationStatus::Completed);
    }
}
