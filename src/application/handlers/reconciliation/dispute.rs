//! Dispute created / updated.

use crate::domain::foundation::{StateMachine, Timestamp};
use crate::domain::payment::{to_major_units, Dispute, DisputeStatus};
use crate::domain::webhook::DisputeEvent;

use super::engine::ReconciliationEngine;
use super::outcome::ReconciliationError;

impl ReconciliationEngine {
    pub(super) async fn dispute_created(
        &self,
        dispute: &DisputeEvent,
    ) -> Result<(), ReconciliationError> {
        self.require_transaction(dispute).await?;

        let status = self.record_dispute(dispute).await?;
        if status.is_terminal() {
            tracing::info!(
                dispute_id = %dispute.dispute_id,
                status = status.as_str(),
                "Dispute already closed, flag left clear"
            );
            return self.set_flag(dispute, false).await;
        }

        // The flag is set whether or not a ledger exists.
        self.set_flag(dispute, true).await?;

        // A close recorded between the upsert and the flag write must win.
        if self.recorded_status(dispute).await?.is_some_and(|s| s.is_terminal()) {
            self.set_flag(dispute, false).await?;
        }
        Ok(())
    }

    pub(super) async fn dispute_updated(
        &self,
        dispute: &DisputeEvent,
    ) -> Result<(), ReconciliationError> {
        self.require_transaction(dispute).await?;

        let status = self.record_dispute(dispute).await?;
        if status.is_terminal() {
            self.set_flag(dispute, false).await?;
        }
        Ok(())
    }

    async fn require_transaction(&self, dispute: &DisputeEvent) -> Result<(), ReconciliationError> {
        let id = &dispute.transaction_id;
        self.bounded("find_transaction", self.transactions.find(id))
            .await?
            .ok_or_else(|| ReconciliationError::TransactionNotFound(id.clone()))?;
        Ok(())
    }

    async fn set_flag(
        &self,
        dispute: &DisputeEvent,
        has_dispute: bool,
    ) -> Result<(), ReconciliationError> {
        let id = &dispute.transaction_id;
        let found = self
            .bounded(
                "set_dispute_flag",
                self.transactions.set_dispute_flag(id, has_dispute),
            )
            .await?;
        if !found {
            return Err(ReconciliationError::TransactionNotFound(id.clone()));
        }
        Ok(())
    }

    /// Upserts the dispute into the ledger when this deployment has one.
    ///
    /// Returns the status the dispute ends up in: the ledger's merged status
    /// when a ledger exists, otherwise the status the event reports.
    async fn record_dispute(
        &self,
        dispute: &DisputeEvent,
    ) -> Result<DisputeStatus, ReconciliationError> {
        let reported = parse_status(dispute)?;
        let Some(ledger) = self
            .bounded("probe_dispute_ledger", self.ledgers.dispute_ledger())
            .await?
        else {
            tracing::debug!(dispute_id = %dispute.dispute_id, "No dispute ledger, skipping record");
            return Ok(reported);
        };

        let record = Dispute::new(
            dispute.dispute_id.clone(),
            dispute.transaction_id.clone(),
            to_major_units(dispute.amount_minor, &dispute.currency),
            &dispute.currency,
            reported,
            Timestamp::now(),
        )
        .map_err(|e| ReconciliationError::InvalidEvent(e.to_string()))?
        .with_reason(dispute.reason.clone())
        .with_evidence_due_by(dispute.evidence_due_by);

        let stored = self.bounded("upsert_dispute", ledger.upsert(&record)).await?;
        if stored.status != record.status {
            tracing::warn!(
                dispute_id = %dispute.dispute_id,
                stored_status = stored.status.as_str(),
                reported_status = record.status.as_str(),
                "Stale dispute update ignored for closed dispute"
            );
        }
        Ok(stored.status)
    }

    async fn recorded_status(
        &self,
        dispute: &DisputeEvent,
    ) -> Result<Option<DisputeStatus>, ReconciliationError> {
        let Some(ledger) = self
            .bounded("probe_dispute_ledger", self.ledgers.dispute_ledger())
            .await?
        else {
            return Ok(None);
        };
        let stored = self
            .bounded("find_dispute", ledger.find(&dispute.dispute_id))
            .await?;
        Ok(stored.map(|d| d.status))
    }
}

fn parse_status(dispute: &DisputeEvent) -> Result<DisputeStatus, ReconciliationError> {
    DisputeStatus::from_gateway(&dispute.status)
        .map_err(|e| ReconciliationError::InvalidEvent(e.to_string()))
}
