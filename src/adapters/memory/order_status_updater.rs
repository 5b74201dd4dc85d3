//! In-memory order store implementing OrderStatusUpdater.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, OrderId, TransactionId};
use crate::ports::OrderStatusUpdater;

/// Payment state of an order as tracked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPaymentState {
    AwaitingPayment,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub state: OrderPaymentState,
    pub transaction_id: Option<TransactionId>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an order awaiting payment, optionally reserved by a transaction.
    pub async fn reserve(&self, order_id: OrderId, transaction_id: Option<TransactionId>) {
        self.orders.write().await.insert(
            order_id,
            OrderRecord {
                state: OrderPaymentState::AwaitingPayment,
                transaction_id,
            },
        );
    }

    pub async fn get(&self, order_id: &OrderId) -> Option<OrderRecord> {
        self.orders.read().await.get(order_id).cloned()
    }
}

#[async_trait]
impl OrderStatusUpdater for InMemoryOrderStore {
    async fn mark_paid(
        &self,
        transaction_id: &TransactionId,
        order_ids: &[OrderId],
    ) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        for order_id in order_ids {
            orders.insert(
                order_id.clone(),
                OrderRecord {
                    state: OrderPaymentState::Paid,
                    transaction_id: Some(transaction_id.clone()),
                },
            );
        }
        Ok(())
    }

    async fn revert_to_unpaid(
        &self,
        transaction_id: &TransactionId,
        order_ids: &[OrderId],
    ) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        for order_id in order_ids {
            if let Some(order) = orders.get_mut(order_id) {
                // Orders since claimed by another attempt are left alone.
                if order.transaction_id.as_ref().map_or(true, |t| t == transaction_id) {
                    order.state = OrderPaymentState::AwaitingPayment;
                    order.transaction_id = None;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revert_only_touches_orders_linked_to_the_transaction() {
        let store = InMemoryOrderStore::new();
        let tx_a = TransactionId::new("pi_a").unwrap();
        let tx_b = TransactionId::new("pi_b").unwrap();
        let q1 = OrderId::new("q1").unwrap();
        let q2 = OrderId::new("q2").unwrap();
        store.reserve(q1.clone(), Some(tx_a.clone())).await;
        store.reserve(q2.clone(), Some(tx_b.clone())).await;

        store.revert_to_unpaid(&tx_a, &[q1.clone(), q2.clone()]).await.unwrap();

        assert_eq!(store.get(&q1).await.unwrap().transaction_id, None);
        assert_eq!(store.get(&q2).await.unwrap().transaction_id, Some(tx_b));
    }

    #[tokio::test]
    async fn mark_paid_links_orders() {
        let store = InMemoryOrderStore::new();
        let tx = TransactionId::new("pi_a").unwrap();
        let q1 = OrderId::new("q1").unwrap();

        store.mark_paid(&tx, &[q1.clone()]).await.unwrap();

        let order = store.get(&q1).await.unwrap();
        assert_eq!(order.state, OrderPaymentState::Paid);
        assert_eq!(order.transaction_id, Some(tx));
    }
}
