//! Refund succeeded / failed.

use rust_decimal::Decimal;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{to_major_units, Refund, RefundStatus};
use crate::domain::webhook::RefundEvent;

use super::engine::ReconciliationEngine;
use super::outcome::ReconciliationError;

impl ReconciliationEngine {
    pub(super) async fn refund_succeeded(
        &self,
        refund: &RefundEvent,
    ) -> Result<(), ReconciliationError> {
        let id = &refund.transaction_id;
        let amount = to_major_units(refund.amount_minor, &refund.currency);
        if amount <= Decimal::ZERO {
            return Err(ReconciliationError::InvalidEvent(format!(
                "refund {} has non-positive amount",
                refund.refund_id
            )));
        }

        let application = self
            .bounded(
                "apply_refund",
                self.transactions.apply_refund(id, &refund.refund_id, amount),
            )
            .await?
            .ok_or_else(|| ReconciliationError::TransactionNotFound(id.clone()))?;

        if !application.applied {
            tracing::info!(
                transaction_id = %id,
                refund_id = %refund.refund_id,
                "Refund already applied, skipping accumulation"
            );
        } else if application.capped {
            tracing::warn!(
                transaction_id = %id,
                refund_id = %refund.refund_id,
                refunded_amount = %application.refunded_amount,
                "Refund total exceeded transaction amount and was capped"
            );
        }

        self.record_refund(refund, RefundStatus::Succeeded, amount).await
    }

    pub(super) async fn refund_failed(&self, refund: &RefundEvent) -> Result<(), ReconciliationError> {
        let id = &refund.transaction_id;
        self.bounded("find_transaction", self.transactions.find(id))
            .await?
            .ok_or_else(|| ReconciliationError::TransactionNotFound(id.clone()))?;

        let amount = to_major_units(refund.amount_minor, &refund.currency);
        self.record_refund(refund, RefundStatus::Failed, amount).await
    }

    /// Upserts the refund into the ledger when this deployment has one.
    async fn record_refund(
        &self,
        refund: &RefundEvent,
        status: RefundStatus,
        amount: Decimal,
    ) -> Result<(), ReconciliationError> {
        let Some(ledger) = self
            .bounded("probe_refund_ledger", self.ledgers.refund_ledger())
            .await?
        else {
            tracing::debug!(refund_id = %refund.refund_id, "No refund ledger, skipping record");
            return Ok(());
        };

        let record = Refund::new(
            refund.refund_id.clone(),
            refund.transaction_id.clone(),
            amount,
            &refund.currency,
            status,
            Timestamp::now(),
        )
        .map_err(|e| ReconciliationError::InvalidEvent(e.to_string()))?
        .with_reason(refund.reason.clone())
        .with_failure_reason(match status {
            RefundStatus::Failed => refund.failure_reason.clone(),
            RefundStatus::Succeeded => None,
        });

        self.bounded("upsert_refund", ledger.upsert(&record)).await?;
        Ok(())
    }
}
