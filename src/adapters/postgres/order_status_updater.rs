//! PostgreSQL implementation of OrderStatusUpdater.
//!
//! Touches only the payment columns of `orders`; nothing else about an order
//! is read or written here.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, TransactionId};
use crate::ports::OrderStatusUpdater;

const AWAITING_PAYMENT: &str = "awaiting_payment";
const PAID: &str = "paid";

pub struct PostgresOrderStatusUpdater {
    pool: PgPool,
}

impl PostgresOrderStatusUpdater {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ids(order_ids: &[OrderId]) -> Vec<String> {
    order_ids.iter().map(|id| id.as_str().to_string()).collect()
}

#[async_trait]
impl OrderStatusUpdater for PostgresOrderStatusUpdater {
    async fn mark_paid(
        &self,
        transaction_id: &TransactionId,
        order_ids: &[OrderId],
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = $1, transaction_id = $2, updated_at = NOW()
            WHERE order_id = ANY($3)
            "#,
        )
        .bind(PAID)
        .bind(transaction_id.as_str())
        .bind(ids(order_ids))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to mark orders paid: {}", e))
        })?;

        if result.rows_affected() < order_ids.len() as u64 {
            tracing::warn!(
                transaction_id = %transaction_id,
                requested = order_ids.len(),
                updated = result.rows_affected(),
                "Some orders referenced by payment were not found"
            );
        }

        Ok(())
    }

    async fn revert_to_unpaid(
        &self,
        transaction_id: &TransactionId,
        order_ids: &[OrderId],
    ) -> Result<(), DomainError> {
        // Orders since claimed by another attempt are left alone.
        sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = $1, transaction_id = NULL, updated_at = NOW()
            WHERE order_id = ANY($3)
              AND (transaction_id IS NULL OR transaction_id = $2)
            "#,
        )
        .bind(AWAITING_PAYMENT)
        .bind(transaction_id.as_str())
        .bind(ids(order_ids))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to revert orders: {}", e))
        })?;

        Ok(())
    }
}
