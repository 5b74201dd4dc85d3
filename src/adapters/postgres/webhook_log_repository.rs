//! PostgreSQL implementation of WebhookLogRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, RequestId, Timestamp, ValidationError};
use crate::domain::payment::Gateway;
use crate::domain::webhook::{WebhookLogEntry, WebhookLogStatus};
use crate::ports::WebhookLogRepository;

pub struct PostgresWebhookLogRepository {
    pool: PgPool,
}

impl PostgresWebhookLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookLogRow {
    request_id: String,
    webhook_type: String,
    event_type: String,
    event_id: String,
    status: String,
    error_message: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WebhookLogRow> for WebhookLogEntry {
    type Error = DomainError;

    fn try_from(row: WebhookLogRow) -> Result<Self, Self::Error> {
        let webhook_type: Gateway = row.webhook_type.parse().map_err(corrupt_row)?;
        Ok(WebhookLogEntry {
            request_id: RequestId::from_string(row.request_id),
            webhook_type,
            event_type: row.event_type,
            event_id: row.event_id,
            status: WebhookLogStatus::parse(&row.status).map_err(corrupt_row)?,
            error_message: row.error_message,
            user_agent: row.user_agent,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn corrupt_row(e: ValidationError) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored webhook log: {}", e))
}

#[async_trait]
impl WebhookLogRepository for PostgresWebhookLogRepository {
    async fn insert(&self, entry: &WebhookLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_logs (
                request_id, webhook_type, event_type, event_id, status,
                error_message, user_agent, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.request_id.as_str())
        .bind(entry.webhook_type.as_str())
        .bind(&entry.event_type)
        .bind(&entry.event_id)
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .bind(&entry.user_agent)
        .bind(entry.created_at.as_datetime())
        .bind(entry.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to insert webhook log: {}", e))
        })?;

        Ok(())
    }

    async fn update_status(
        &self,
        request_id: &RequestId,
        status: WebhookLogStatus,
        error_message: Option<&str>,
        updated_at: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_logs
            SET status = $2, error_message = $3, updated_at = $4
            WHERE request_id = $1
            "#,
        )
        .bind(request_id.as_str())
        .bind(status.as_str())
        .bind(error_message)
        .bind(updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update webhook log: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::WebhookLogNotFound,
                format!("Webhook log {} not found", request_id),
            ));
        }

        Ok(())
    }

    async fn find(&self, request_id: &RequestId) -> Result<Option<WebhookLogEntry>, DomainError> {
        let row: Option<WebhookLogRow> = sqlx::query_as(
            r#"
            SELECT request_id, webhook_type, event_type, event_id, status,
                   error_message, user_agent, created_at, updated_at
            FROM webhook_logs
            WHERE request_id = $1
            "#,
        )
        .bind(request_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find webhook log: {}", e))
        })?;

        row.map(WebhookLogEntry::try_from).transpose()
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_logs WHERE created_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to delete webhook logs: {}", e),
                )
            })?;

        Ok(result.rows_affected())
    }
}
