//! ReconciliationEngine - Applies verified gateway events to payment records.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::DomainError;
use crate::domain::webhook::{EventKind, GatewayEvent};
use crate::ports::{LedgerCapabilities, OrderStatusUpdater, TransactionRepository};

use super::outcome::{ReconciliationError, ReconciliationOutcome};

/// Default bound on every port call made while applying an event.
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Applies gateway events to transactions, ledgers and orders.
///
/// The engine is the only writer of event-derived payment state. It keeps no
/// state of its own, so any number of deliveries may be applied concurrently;
/// consistency comes from the repository's atomic operations.
pub struct ReconciliationEngine {
    pub(super) transactions: Arc<dyn TransactionRepository>,
    pub(super) ledgers: Arc<dyn LedgerCapabilities>,
    pub(super) orders: Arc<dyn OrderStatusUpdater>,
    port_timeout: Duration,
}

impl ReconciliationEngine {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        ledgers: Arc<dyn LedgerCapabilities>,
        orders: Arc<dyn OrderStatusUpdater>,
    ) -> Self {
        Self {
            transactions,
            ledgers,
            orders,
            port_timeout: DEFAULT_PORT_TIMEOUT,
        }
    }

    pub fn with_port_timeout(mut self, timeout: Duration) -> Self {
        self.port_timeout = timeout;
        self
    }

    /// Applies one event. Always returns an outcome; nothing escapes.
    ///
    /// Unhandled event types succeed without touching any state.
    pub async fn apply(&self, event: &GatewayEvent) -> ReconciliationOutcome {
        let result = AssertUnwindSafe(self.dispatch(event)).catch_unwind().await;
        let result = match result {
            Ok(result) => result,
            Err(_) => Err(ReconciliationError::Internal),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    gateway = %event.gateway,
                    kind = event.kind.name(),
                    "Webhook event reconciled"
                );
                ReconciliationOutcome::success()
            }
            Err(err) => {
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    gateway = %event.gateway,
                    transaction_id = event.kind.transaction_id().map(|t| t.as_str()),
                    error = %err,
                    "Webhook event reconciliation failed"
                );
                ReconciliationOutcome::failure(err.to_string())
            }
        }
    }

    async fn dispatch(&self, event: &GatewayEvent) -> Result<(), ReconciliationError> {
        match &event.kind {
            EventKind::PaymentSucceeded(payment) => {
                self.payment_succeeded(payment, &event.object).await
            }
            EventKind::PaymentFailed { payment, outcome } => {
                self.payment_failed(payment, *outcome, &event.object).await
            }
            EventKind::RefundSucceeded(refund) => self.refund_succeeded(refund).await,
            EventKind::RefundFailed(refund) => self.refund_failed(refund).await,
            EventKind::DisputeCreated(dispute) => self.dispute_created(dispute).await,
            EventKind::DisputeUpdated(dispute) => self.dispute_updated(dispute).await,
            EventKind::Unhandled => {
                tracing::debug!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "No handler for event type, acknowledging"
                );
                Ok(())
            }
        }
    }

    /// Runs a port call under the engine's timeout, leaving its own error
    /// for the caller to inspect.
    pub(super) async fn within<T, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> Result<Result<T, DomainError>, ReconciliationError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        tokio::time::timeout(self.port_timeout, call)
            .await
            .map_err(|_| ReconciliationError::Timeout { operation })
    }

    /// Runs a port call under the engine's timeout.
    pub(super) async fn bounded<T, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> Result<T, ReconciliationError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        self.within(operation, call)
            .await?
            .map_err(|source| ReconciliationError::Port { operation, source })
    }
}
