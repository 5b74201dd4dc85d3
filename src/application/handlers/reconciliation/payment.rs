//! Payment succeeded / failed / cancelled.

use crate::domain::foundation::{ErrorCode, OrderId};
use crate::domain::payment::{normalize_currency, to_major_units, FailureStatus, PaymentTransaction};
use crate::domain::webhook::PaymentEvent;

use super::engine::ReconciliationEngine;
use super::outcome::ReconciliationError;

impl ReconciliationEngine {
    pub(super) async fn payment_succeeded(
        &self,
        payment: &PaymentEvent,
        object: &serde_json::Value,
    ) -> Result<(), ReconciliationError> {
        let id = &payment.transaction_id;

        let transaction = self
            .bounded(
                "mark_completed",
                self.transactions
                    .mark_completed(id, &payment.order_ids, Some(object.clone())),
            )
            .await?
            .ok_or_else(|| ReconciliationError::TransactionNotFound(id.clone()))?;

        warn_on_amount_mismatch(&transaction, payment);

        if !payment.order_ids.is_empty() {
            self.bounded("mark_paid", self.orders.mark_paid(id, &payment.order_ids))
                .await?;
        }

        Ok(())
    }

    pub(super) async fn payment_failed(
        &self,
        payment: &PaymentEvent,
        outcome: FailureStatus,
        object: &serde_json::Value,
    ) -> Result<(), ReconciliationError> {
        let id = &payment.transaction_id;

        let released = match self
            .within(
                "mark_failed",
                self.transactions.mark_failed(
                    id,
                    outcome,
                    payment.failure_reason.clone(),
                    Some(object.clone()),
                ),
            )
            .await?
        {
            Ok(Some(released)) => released,
            Ok(None) => return Err(ReconciliationError::TransactionNotFound(id.clone())),
            Err(err) if err.code == ErrorCode::InvalidStateTransition => {
                // A failed attempt reported after the payment settled.
                tracing::warn!(
                    transaction_id = %id,
                    outcome = ?outcome,
                    "Ignoring failure event for settled transaction"
                );
                return Ok(());
            }
            Err(source) => {
                return Err(ReconciliationError::Port {
                    operation: "mark_failed",
                    source,
                })
            }
        };

        let mut to_revert: Vec<OrderId> = released;
        for order_id in &payment.order_ids {
            if !to_revert.contains(order_id) {
                to_revert.push(order_id.clone());
            }
        }

        if !to_revert.is_empty() {
            self.bounded("revert_to_unpaid", self.orders.revert_to_unpaid(id, &to_revert))
                .await?;
        }

        Ok(())
    }
}

fn warn_on_amount_mismatch(transaction: &PaymentTransaction, payment: &PaymentEvent) {
    let (Some(amount_minor), Some(currency)) = (payment.amount_minor, payment.currency.as_deref())
    else {
        return;
    };
    let reported = to_major_units(amount_minor, currency);
    let currency = normalize_currency(currency);
    if reported != transaction.amount || currency != transaction.currency {
        tracing::warn!(
            transaction_id = %transaction.transaction_id,
            stored_amount = %transaction.amount,
            stored_currency = %transaction.currency,
            reported_amount = %reported,
            reported_currency = %currency,
            "Gateway amount differs from stored transaction"
        );
    }
}
