//! In-memory TransactionRepository.
//!
//! Each mutation holds the write lock for its whole read-modify-write, which
//! gives the same atomicity the Postgres adapter gets from single statements.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, Timestamp, TransactionId, ValidationError,
};
use crate::domain::payment::{
    FailureStatus, PaymentTransaction, RefundApplication, VerificationStatus,
};
use crate::ports::TransactionRepository;

/// In-memory transaction store for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionRepository {
    transactions: Arc<RwLock<HashMap<TransactionId, PaymentTransaction>>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a transaction.
    pub async fn insert(&self, transaction: PaymentTransaction) {
        self.transactions
            .write()
            .await
            .insert(transaction.transaction_id.clone(), transaction);
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

fn transition_error(err: ValidationError) -> DomainError {
    DomainError::new(ErrorCode::InvalidStateTransition, err.to_string())
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn find(&self, id: &TransactionId) -> Result<Option<PaymentTransaction>, DomainError> {
        Ok(self.transactions.read().await.get(id).cloned())
    }

    async fn save(&self, transaction: &PaymentTransaction) -> Result<(), DomainError> {
        self.transactions
            .write()
            .await
            .insert(transaction.transaction_id.clone(), transaction.clone());
        Ok(())
    }

    async fn mark_completed(
        &self,
        id: &TransactionId,
        order_ids: &[OrderId],
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Option<PaymentTransaction>, DomainError> {
        let mut transactions = self.transactions.write().await;
        let Some(transaction) = transactions.get_mut(id) else {
            return Ok(None);
        };
        transaction
            .complete(order_ids, gateway_response, Timestamp::now())
            .map_err(transition_error)?;
        Ok(Some(transaction.clone()))
    }

    async fn mark_failed(
        &self,
        id: &TransactionId,
        outcome: FailureStatus,
        reason: Option<String>,
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Option<Vec<OrderId>>, DomainError> {
        let mut transactions = self.transactions.write().await;
        let Some(transaction) = transactions.get_mut(id) else {
            return Ok(None);
        };
        let released = transaction
            .fail(outcome, reason, gateway_response, Timestamp::now())
            .map_err(transition_error)?;
        Ok(Some(released))
    }

    async fn apply_refund(
        &self,
        id: &TransactionId,
        refund_id: &str,
        amount: Decimal,
    ) -> Result<Option<RefundApplication>, DomainError> {
        let mut transactions = self.transactions.write().await;
        let Some(transaction) = transactions.get_mut(id) else {
            return Ok(None);
        };
        let application = transaction.apply_refund(refund_id, amount, Timestamp::now())?;
        Ok(Some(application))
    }

    async fn set_dispute_flag(
        &self,
        id: &TransactionId,
        has_dispute: bool,
    ) -> Result<bool, DomainError> {
        let mut transactions = self.transactions.write().await;
        let Some(transaction) = transactions.get_mut(id) else {
            return Ok(false);
        };
        if has_dispute {
            transaction.open_dispute(Timestamp::now());
        } else {
            transaction.resolve_dispute(Timestamp::now());
        }
        Ok(true)
    }

    async fn record_verification(
        &self,
        id: &TransactionId,
        status: VerificationStatus,
        verified_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut transactions = self.transactions.write().await;
        let Some(transaction) = transactions.get_mut(id) else {
            return Ok(false);
        };
        transaction.record_verification(status, verified_at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{Gateway, TransactionStatus};
    use rust_decimal_macros::dec;

    fn tx_id() -> TransactionId {
        TransactionId::new("pi_mem").unwrap()
    }

    async fn seeded(amount: Decimal) -> InMemoryTransactionRepository {
        let repo = InMemoryTransactionRepository::new();
        repo.insert(PaymentTransaction::new(
            tx_id(),
            Gateway::Stripe,
            amount,
            "usd",
            Timestamp::now(),
        ))
        .await;
        repo
    }

    #[tokio::test]
    async fn mutations_on_missing_transaction_report_absence() {
        let repo = InMemoryTransactionRepository::new();
        let id = tx_id();

        assert!(repo.mark_completed(&id, &[], None).await.unwrap().is_none());
        assert!(repo
            .mark_failed(&id, FailureStatus::Failed, None, None)
            .await
            .unwrap()
            .is_none());
        assert!(repo.apply_refund(&id, "re_1", dec!(1)).await.unwrap().is_none());
        assert!(!repo.set_dispute_flag(&id, true).await.unwrap());
    }

    #[tokio::test]
    async fn failing_settled_transaction_is_an_invalid_transition() {
        let repo = seeded(dec!(10)).await;
        repo.mark_completed(&tx_id(), &[], None).await.unwrap();

        let err = repo
            .mark_failed(&tx_id(), FailureStatus::Failed, None, None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[tokio::test]
    async fn concurrent_half_refunds_sum_to_amount() {
        let repo = seeded(dec!(100.50)).await;

        let a = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.apply_refund(&tx_id(), "re_a", dec!(50.25)).await })
        };
        let b = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.apply_refund(&tx_id(), "re_b", dec!(50.25)).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let tx = repo.find(&tx_id()).await.unwrap().unwrap();
        assert_eq!(tx.refunded_amount, dec!(100.50));
        assert_eq!(tx.status, TransactionStatus::Refunded);
    }
}
