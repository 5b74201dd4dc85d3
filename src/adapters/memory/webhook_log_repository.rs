//! In-memory WebhookLogRepository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, RequestId, Timestamp};
use crate::domain::webhook::{WebhookLogEntry, WebhookLogStatus};
use crate::ports::WebhookLogRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookLogRepository {
    entries: Arc<RwLock<HashMap<RequestId, WebhookLogEntry>>>,
}

impl InMemoryWebhookLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, oldest first.
    pub async fn entries(&self) -> Vec<WebhookLogEntry> {
        let mut entries: Vec<_> = self.entries.read().await.values().cloned().collect();
        entries.sort_by_key(|e| e.created_at);
        entries
    }
}

#[async_trait]
impl WebhookLogRepository for InMemoryWebhookLogRepository {
    async fn insert(&self, entry: &WebhookLogEntry) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.request_id) {
            return Err(DomainError::database("duplicate webhook log request id")
                .with_detail("request_id", entry.request_id.as_str()));
        }
        entries.insert(entry.request_id.clone(), entry.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        request_id: &RequestId,
        status: WebhookLogStatus,
        error_message: Option<&str>,
        updated_at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(request_id).ok_or_else(|| {
            DomainError::new(ErrorCode::WebhookLogNotFound, "Webhook log entry not found")
                .with_detail("request_id", request_id.as_str())
        })?;
        entry.status = status;
        entry.error_message = error_message.map(str::to_string);
        entry.updated_at = updated_at;
        Ok(())
    }

    async fn find(&self, request_id: &RequestId) -> Result<Option<WebhookLogEntry>, DomainError> {
        Ok(self.entries.read().await.get(request_id).cloned())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.created_at.is_before(&cutoff));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Gateway;

    fn entry(id: &str, created_at: Timestamp) -> WebhookLogEntry {
        WebhookLogEntry::processing(
            RequestId::from_string(id),
            Gateway::Stripe,
            "refund.created",
            "evt_1",
            None,
            created_at,
        )
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let repo = InMemoryWebhookLogRepository::new();
        let now = Timestamp::now();

        repo.insert(&entry("r1", now)).await.unwrap();
        assert!(repo.insert(&entry("r1", now)).await.is_err());
    }

    #[tokio::test]
    async fn update_missing_entry_is_not_found() {
        let repo = InMemoryWebhookLogRepository::new();
        let err = repo
            .update_status(
                &RequestId::from_string("nope"),
                WebhookLogStatus::Completed,
                None,
                Timestamp::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::WebhookLogNotFound);
    }

    #[tokio::test]
    async fn delete_before_removes_only_older_entries() {
        let repo = InMemoryWebhookLogRepository::new();
        let now = Timestamp::from_unix_secs(1_700_000_000).unwrap();
        repo.insert(&entry("old", now.minus_secs(86_400 * 40))).await.unwrap();
        repo.insert(&entry("new", now)).await.unwrap();

        let removed = repo.delete_before(now.minus_secs(86_400 * 30)).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(repo.entries().await.len(), 1);
    }
}
