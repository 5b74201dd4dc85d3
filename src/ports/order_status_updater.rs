//! OrderStatusUpdater port - The two order mutations reconciliation may perform.
//!
//! Orders (quotes, invoices) belong to another part of the system. The
//! reconciliation engine only ever moves them between "awaiting payment" and
//! "paid" through this port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, TransactionId};

#[async_trait]
pub trait OrderStatusUpdater: Send + Sync {
    /// Move the orders to their paid state, linked to `transaction_id`.
    async fn mark_paid(
        &self,
        transaction_id: &TransactionId,
        order_ids: &[OrderId],
    ) -> Result<(), DomainError>;

    /// Move the orders back to their pre-payment state and clear their link
    /// to `transaction_id` so a new attempt can claim them.
    async fn revert_to_unpaid(
        &self,
        transaction_id: &TransactionId,
        order_ids: &[OrderId],
    ) -> Result<(), DomainError>;
}
