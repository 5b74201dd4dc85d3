//! PostgreSQL refund and dispute ledgers.
//!
//! The ledger tables are optional per deployment. [`PostgresLedgers`] probes
//! for them with `to_regclass` before handing out a ledger, so "not
//! installed" is never confused with "write failed".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, TransactionId, ValidationError};
use crate::domain::payment::{Dispute, DisputeStatus, Refund, RefundStatus};
use crate::ports::{DisputeLedger, LedgerCapabilities, RefundLedger};

const REFUNDS_TABLE: &str = "payment_refunds";
const DISPUTES_TABLE: &str = "payment_disputes";

fn db_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

fn corrupt_row(e: ValidationError) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored ledger row: {}", e))
}

// ════════════════════════════════════════════════════════════════════════════
// Capability probe
// ════════════════════════════════════════════════════════════════════════════

/// Probes the database for optional ledger tables.
pub struct PostgresLedgers {
    pool: PgPool,
}

impl PostgresLedgers {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DomainError> {
        let (exists,): (bool,) = sqlx::query_as("SELECT to_regclass($1) IS NOT NULL")
            .bind(format!("public.{}", table))
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("probe ledger table"))?;
        Ok(exists)
    }
}

#[async_trait]
impl LedgerCapabilities for PostgresLedgers {
    async fn refund_ledger(&self) -> Result<Option<Arc<dyn RefundLedger>>, DomainError> {
        if !self.table_exists(REFUNDS_TABLE).await? {
            return Ok(None);
        }
        Ok(Some(Arc::new(PostgresRefundLedger::new(self.pool.clone()))))
    }

    async fn dispute_ledger(&self) -> Result<Option<Arc<dyn DisputeLedger>>, DomainError> {
        if !self.table_exists(DISPUTES_TABLE).await? {
            return Ok(None);
        }
        Ok(Some(Arc::new(PostgresDisputeLedger::new(self.pool.clone()))))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Refunds
// ════════════════════════════════════════════════════════════════════════════

pub struct PostgresRefundLedger {
    pool: PgPool,
}

impl PostgresRefundLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    refund_id: String,
    transaction_id: String,
    amount: Decimal,
    currency: String,
    status: String,
    reason: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RefundRow> for Refund {
    type Error = DomainError;

    fn try_from(row: RefundRow) -> Result<Self, Self::Error> {
        Ok(Refund {
            refund_id: row.refund_id,
            transaction_id: TransactionId::new(row.transaction_id).map_err(corrupt_row)?,
            amount: row.amount,
            currency: row.currency,
            status: RefundStatus::parse(&row.status).map_err(corrupt_row)?,
            reason: row.reason,
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl RefundLedger for PostgresRefundLedger {
    async fn upsert(&self, refund: &Refund) -> Result<Refund, DomainError> {
        let row: RefundRow = sqlx::query_as(
            r#"
            INSERT INTO payment_refunds (
                refund_id, transaction_id, amount, currency, status, reason,
                failure_reason, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (refund_id) DO UPDATE SET
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                status = EXCLUDED.status,
                reason = COALESCE(EXCLUDED.reason, payment_refunds.reason),
                failure_reason = EXCLUDED.failure_reason,
                updated_at = EXCLUDED.updated_at
            RETURNING refund_id, transaction_id, amount, currency, status, reason,
                      failure_reason, created_at, updated_at
            "#,
        )
        .bind(&refund.refund_id)
        .bind(refund.transaction_id.as_str())
        .bind(refund.amount)
        .bind(&refund.currency)
        .bind(refund.status.as_str())
        .bind(&refund.reason)
        .bind(&refund.failure_reason)
        .bind(refund.created_at.as_datetime())
        .bind(refund.updated_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("upsert refund"))?;

        Refund::try_from(row)
    }

    async fn find(&self, refund_id: &str) -> Result<Option<Refund>, DomainError> {
        let row: Option<RefundRow> = sqlx::query_as(
            r#"
            SELECT refund_id, transaction_id, amount, currency, status, reason,
                   failure_reason, created_at, updated_at
            FROM payment_refunds
            WHERE refund_id = $1
            "#,
        )
        .bind(refund_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find refund"))?;

        row.map(Refund::try_from).transpose()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Disputes
// ════════════════════════════════════════════════════════════════════════════

pub struct PostgresDisputeLedger {
    pool: PgPool,
}

impl PostgresDisputeLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DisputeRow {
    dispute_id: String,
    transaction_id: String,
    amount: Decimal,
    currency: String,
    status: String,
    reason: Option<String>,
    evidence_due_by: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DisputeRow> for Dispute {
    type Error = DomainError;

    fn try_from(row: DisputeRow) -> Result<Self, Self::Error> {
        Ok(Dispute {
            dispute_id: row.dispute_id,
            transaction_id: TransactionId::new(row.transaction_id).map_err(corrupt_row)?,
            amount: row.amount,
            currency: row.currency,
            status: DisputeStatus::from_gateway(&row.status).map_err(corrupt_row)?,
            reason: row.reason,
            evidence_due_by: row.evidence_due_by.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl DisputeLedger for PostgresDisputeLedger {
    async fn upsert(&self, dispute: &Dispute) -> Result<Dispute, DomainError> {
        // A closed dispute keeps its outcome against stale updates.
        let row: DisputeRow = sqlx::query_as(
            r#"
            INSERT INTO payment_disputes (
                dispute_id, transaction_id, amount, currency, status, reason,
                evidence_due_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (dispute_id) DO UPDATE SET
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                status = CASE
                    WHEN payment_disputes.status IN ('won', 'lost')
                         AND payment_disputes.status <> EXCLUDED.status
                    THEN payment_disputes.status
                    ELSE EXCLUDED.status
                END,
                reason = COALESCE(EXCLUDED.reason, payment_disputes.reason),
                evidence_due_by = COALESCE(EXCLUDED.evidence_due_by, payment_disputes.evidence_due_by),
                updated_at = EXCLUDED.updated_at
            RETURNING dispute_id, transaction_id, amount, currency, status, reason,
                      evidence_due_by, created_at, updated_at
            "#,
        )
        .bind(&dispute.dispute_id)
        .bind(dispute.transaction_id.as_str())
        .bind(dispute.amount)
        .bind(&dispute.currency)
        .bind(dispute.status.as_str())
        .bind(&dispute.reason)
        .bind(dispute.evidence_due_by.map(|t| *t.as_datetime()))
        .bind(dispute.created_at.as_datetime())
        .bind(dispute.updated_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("upsert dispute"))?;

        Dispute::try_from(row)
    }

    async fn find(&self, dispute_id: &str) -> Result<Option<Dispute>, DomainError> {
        let row: Option<DisputeRow> = sqlx::query_as(
            r#"
            SELECT dispute_id, transaction_id, amount, currency, status, reason,
                   evidence_due_by, created_at, updated_at
            FROM payment_disputes
            WHERE dispute_id = $1
            "#,
        )
        .bind(dispute_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find dispute"))?;

        row.map(Dispute::try_from).transpose()
    }
}
