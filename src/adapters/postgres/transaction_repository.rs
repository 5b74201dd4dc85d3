//! PostgreSQL implementation of TransactionRepository.
//!
//! Every mutation is one statement, or one row-locked transaction, so
//! concurrent webhook deliveries for the same payment serialize in the
//! database rather than in the process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, StateMachine, Timestamp, TransactionId, ValidationError,
};
use crate::domain::payment::{
    FailureStatus, Gateway, PaymentTransaction, RefundApplication, TransactionStatus,
    VerificationStatus,
};
use crate::ports::TransactionRepository;

const COLUMNS: &str = r#"
    transaction_id, gateway, amount, currency, status, refunded_amount, has_dispute,
    associated_order_ids, gateway_response, failure_reason, applied_refund_ids,
    last_verified_status, last_verified_at, created_at, updated_at
"#;

/// Adds one refund to the running total.
///
/// A single UPDATE: a concurrent refund blocks on the row lock and then
/// re-evaluates against the committed total. `SET` expressions see the
/// pre-update row, so the cap flag is computed there. A refund id already in
/// `applied_refund_ids` matches no row.
const APPLY_REFUND: &str = r#"
    UPDATE payment_transactions SET
        refunded_amount = LEAST(refunded_amount + $3, amount),
        status = CASE WHEN refunded_amount + $3 >= amount
                      THEN 'refunded' ELSE 'partially_refunded' END,
        last_refund_capped = (refunded_amount + $3 > amount),
        applied_refund_ids = array_append(applied_refund_ids, $2),
        updated_at = NOW()
    WHERE transaction_id = $1
      AND NOT ($2 = ANY(applied_refund_ids))
    RETURNING refunded_amount, status, last_refund_capped
"#;

/// PostgreSQL implementation of the TransactionRepository port.
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment transaction.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    transaction_id: String,
    gateway: String,
    amount: Decimal,
    currency: String,
    status: String,
    refunded_amount: Decimal,
    has_dispute: bool,
    associated_order_ids: Vec<String>,
    gateway_response: Option<serde_json::Value>,
    failure_reason: Option<String>,
    applied_refund_ids: Vec<String>,
    last_verified_status: Option<String>,
    last_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for PaymentTransaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let gateway: Gateway = row.gateway.parse().map_err(corrupt_row)?;
        let status = TransactionStatus::parse(&row.status).map_err(corrupt_row)?;
        let last_verified_status = match row.last_verified_status {
            Some(s) => Some(VerificationStatus::parse(&s).ok_or_else(|| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid verification status value: {}", s),
                )
            })?),
            None => None,
        };

        Ok(PaymentTransaction {
            transaction_id: TransactionId::new(row.transaction_id).map_err(corrupt_row)?,
            gateway,
            amount: row.amount,
            currency: row.currency,
            status,
            refunded_amount: row.refunded_amount,
            has_dispute: row.has_dispute,
            associated_order_ids: parse_order_ids(row.associated_order_ids)?,
            gateway_response: row.gateway_response,
            failure_reason: row.failure_reason,
            applied_refund_ids: row.applied_refund_ids,
            last_verified_status,
            last_verified_at: row.last_verified_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_order_ids(ids: Vec<String>) -> Result<Vec<OrderId>, DomainError> {
    ids.into_iter()
        .map(|id| OrderId::new(id).map_err(corrupt_row))
        .collect()
}

fn order_id_strings(ids: &[OrderId]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.iter().any(|existing| existing == id.as_str()) {
            out.push(id.as_str().to_string());
        }
    }
    out
}

fn corrupt_row(e: ValidationError) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored transaction: {}", e))
}

fn db_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn find(&self, id: &TransactionId) -> Result<Option<PaymentTransaction>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_transactions WHERE transaction_id = $1",
            COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find transaction"))?;

        row.map(PaymentTransaction::try_from).transpose()
    }

    async fn save(&self, transaction: &PaymentTransaction) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                transaction_id, gateway, amount, currency, status, refunded_amount, has_dispute,
                associated_order_ids, gateway_response, failure_reason, applied_refund_ids,
                last_verified_status, last_verified_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (transaction_id) DO UPDATE SET
                gateway = EXCLUDED.gateway,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                status = EXCLUDED.status,
                refunded_amount = EXCLUDED.refunded_amount,
                has_dispute = EXCLUDED.has_dispute,
                associated_order_ids = EXCLUDED.associated_order_ids,
                gateway_response = EXCLUDED.gateway_response,
                failure_reason = EXCLUDED.failure_reason,
                applied_refund_ids = EXCLUDED.applied_refund_ids,
                last_verified_status = EXCLUDED.last_verified_status,
                last_verified_at = EXCLUDED.last_verified_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(transaction.transaction_id.as_str())
        .bind(transaction.gateway.as_str())
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.status.as_str())
        .bind(transaction.refunded_amount)
        .bind(transaction.has_dispute)
        .bind(order_id_strings(&transaction.associated_order_ids))
        .bind(&transaction.gateway_response)
        .bind(&transaction.failure_reason)
        .bind(&transaction.applied_refund_ids)
        .bind(transaction.last_verified_status.map(|s| s.as_str()))
        .bind(transaction.last_verified_at.map(|t| *t.as_datetime()))
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("save transaction"))?;

        Ok(())
    }

    async fn mark_completed(
        &self,
        id: &TransactionId,
        order_ids: &[OrderId],
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Option<PaymentTransaction>, DomainError> {
        // Refund-derived statuses survive a redelivered success event.
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payment_transactions SET
                status = CASE WHEN status IN ('refunded', 'partially_refunded')
                              THEN status ELSE 'completed' END,
                failure_reason = CASE WHEN status IN ('refunded', 'partially_refunded')
                                      THEN failure_reason ELSE NULL END,
                associated_order_ids = associated_order_ids || ARRAY(
                    SELECT o.id FROM unnest($2::text[]) WITH ORDINALITY AS o(id, n)
                    WHERE NOT (o.id = ANY(associated_order_ids))
                    ORDER BY o.n
                ),
                gateway_response = COALESCE($3, gateway_response),
                updated_at = NOW()
            WHERE transaction_id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.as_str())
        .bind(order_id_strings(order_ids))
        .bind(gateway_response)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("mark transaction completed"))?;

        row.map(PaymentTransaction::try_from).transpose()
    }

    async fn mark_failed(
        &self,
        id: &TransactionId,
        outcome: FailureStatus,
        reason: Option<String>,
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Option<Vec<OrderId>>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("start transaction"))?;

        let current: Option<(String, Vec<String>)> = sqlx::query_as(
            r#"
            SELECT status, associated_order_ids
            FROM payment_transactions
            WHERE transaction_id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("lock transaction"))?;

        let Some((status, released)) = current else {
            return Ok(None);
        };

        let target: TransactionStatus = outcome.into();
        let status = TransactionStatus::parse(&status).map_err(corrupt_row)?;
        if !status.can_transition_to(&target) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition transaction {} from {} to {}",
                    id,
                    status.as_str(),
                    target.as_str()
                ),
            ));
        }

        sqlx::query(
            r#"
            UPDATE payment_transactions SET
                status = $2,
                failure_reason = $3,
                gateway_response = COALESCE($4, gateway_response),
                associated_order_ids = '{}',
                updated_at = NOW()
            WHERE transaction_id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(target.as_str())
        .bind(reason)
        .bind(gateway_response)
        .execute(&mut *tx)
        .await
        .map_err(db_error("mark transaction failed"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;

        parse_order_ids(released).map(Some)
    }

    async fn apply_refund(
        &self,
        id: &TransactionId,
        refund_id: &str,
        amount: Decimal,
    ) -> Result<Option<RefundApplication>, DomainError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::not_positive("refund_amount").into());
        }
        if refund_id.trim().is_empty() {
            return Err(ValidationError::empty_field("refund_id").into());
        }

        let applied: Option<(Decimal, String, bool)> = sqlx::query_as(APPLY_REFUND)
            .bind(id.as_str())
            .bind(refund_id)
            .bind(amount)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("apply refund"))?;

        if let Some(row) = applied {
            return applied_refund(row).map(Some);
        }

        // Either the transaction is unknown or the refund was already applied.
        let current: Option<(Decimal, String)> = sqlx::query_as(
            "SELECT refunded_amount, status FROM payment_transactions WHERE transaction_id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("read refunded amount"))?;

        current
            .map(|(refunded_amount, status)| {
                Ok(RefundApplication {
                    applied: false,
                    refunded_amount,
                    status: TransactionStatus::parse(&status).map_err(corrupt_row)?,
                    capped: false,
                })
            })
            .transpose()
    }

    async fn set_dispute_flag(
        &self,
        id: &TransactionId,
        has_dispute: bool,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET has_dispute = $2, updated_at = NOW()
            WHERE transaction_id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(has_dispute)
        .execute(&self.pool)
        .await
        .map_err(db_error("set dispute flag"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_verification(
        &self,
        id: &TransactionId,
        status: VerificationStatus,
        verified_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET last_verified_status = $2, last_verified_at = $3
            WHERE transaction_id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(status.as_str())
        .bind(verified_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("record verification"))?;

        Ok(result.rows_affected() > 0)
    }
}

fn applied_refund(
    (refunded_amount, status, capped): (Decimal, String, bool),
) -> Result<RefundApplication, DomainError> {
    Ok(RefundApplication {
        applied: true,
        refunded_amount,
        status: TransactionStatus::parse(&status).map_err(corrupt_row)?,
        capped,
    })
}
