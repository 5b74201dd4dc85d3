//! WebhookLogRepository port - Audit trail of webhook deliveries.
//!
//! One row per delivery attempt. The log is for auditing and operations; it
//! is not what keeps reconciliation idempotent.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, RequestId, Timestamp};
use crate::domain::webhook::{WebhookLogEntry, WebhookLogStatus};

#[async_trait]
pub trait WebhookLogRepository: Send + Sync {
    /// Insert a new entry. Fails if the request id already exists.
    async fn insert(&self, entry: &WebhookLogEntry) -> Result<(), DomainError>;

    /// Move an entry to its final status.
    async fn update_status(
        &self,
        request_id: &RequestId,
        status: WebhookLogStatus,
        error_message: Option<&str>,
        updated_at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Find an entry by request id.
    async fn find(&self, request_id: &RequestId) -> Result<Option<WebhookLogEntry>, DomainError>;

    /// Delete entries created before `cutoff`. Returns the number removed.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
