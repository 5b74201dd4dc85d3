//! EventLog - Best-effort audit trail of webhook deliveries.
//!
//! Nothing here can fail a delivery. Insert and update errors are logged at
//! `warn` and swallowed.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode, RequestId, Timestamp};
use crate::domain::payment::Gateway;
use crate::domain::webhook::{WebhookLogEntry, WebhookLogStatus};
use crate::ports::WebhookLogRepository;

/// Default bound on a single log write.
pub const DEFAULT_LOG_TIMEOUT: Duration = Duration::from_secs(2);

/// Proof that `begin` inserted an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHandle {
    request_id: RequestId,
}

impl LogHandle {
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

/// Writes one entry per delivery attempt.
#[derive(Clone)]
pub struct EventLog {
    repository: Arc<dyn WebhookLogRepository>,
    timeout: Duration,
}

impl EventLog {
    pub fn new(repository: Arc<dyn WebhookLogRepository>) -> Self {
        Self {
            repository,
            timeout: DEFAULT_LOG_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Records that a delivery is being processed.
    ///
    /// Returns `None` if the entry could not be written.
    pub async fn begin(
        &self,
        request_id: RequestId,
        gateway: Gateway,
        event_type: &str,
        event_id: &str,
        user_agent: Option<String>,
    ) -> Option<LogHandle> {
        let entry = WebhookLogEntry::processing(
            request_id.clone(),
            gateway,
            event_type,
            event_id,
            user_agent,
            Timestamp::now(),
        );

        match self.bounded(self.repository.insert(&entry)).await {
            Ok(()) => Some(LogHandle { request_id }),
            Err(err) => {
                tracing::warn!(
                    request_id = %request_id,
                    event_id,
                    error = %err,
                    "Failed to write webhook log entry"
                );
                None
            }
        }
    }

    /// Records the final state of a delivery. No-op without a handle.
    pub async fn complete(
        &self,
        handle: Option<&LogHandle>,
        success: bool,
        error_message: Option<&str>,
    ) {
        let Some(handle) = handle else {
            return;
        };

        let status = WebhookLogStatus::from_success(success);
        let update = self.repository.update_status(
            &handle.request_id,
            status,
            error_message,
            Timestamp::now(),
        );
        if let Err(err) = self.bounded(update).await {
            tracing::warn!(
                request_id = %handle.request_id,
                status = status.as_str(),
                error = %err,
                "Failed to update webhook log entry"
            );
        }
    }

    /// Deletes entries older than `cutoff`. Used by the retention sweep.
    pub async fn purge_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let removed = self.bounded(self.repository.delete_before(cutoff)).await?;
        tracing::info!(removed, cutoff = %cutoff, "Purged webhook log entries");
        Ok(removed)
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        tokio::time::timeout(self.timeout, call).await.map_err(|_| {
            DomainError::new(ErrorCode::Timeout, "Webhook log write timed out")
        })?
    }
}
