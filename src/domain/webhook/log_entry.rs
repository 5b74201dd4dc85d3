//! Webhook delivery log record.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{RequestId, Timestamp, ValidationError};
use crate::domain::payment::Gateway;

/// Processing state of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookLogStatus {
    Processing,
    Completed,
    Failed,
}

impl WebhookLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookLogStatus::Processing => "processing",
            WebhookLogStatus::Completed => "completed",
            WebhookLogStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "processing" => Ok(WebhookLogStatus::Processing),
            "completed" => Ok(WebhookLogStatus::Completed),
            "failed" => Ok(WebhookLogStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "webhook_log_status",
                format!("unknown webhook log status '{}'", other),
            )),
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            WebhookLogStatus::Completed
        } else {
            WebhookLogStatus::Failed
        }
    }
}

/// One webhook delivery attempt. Redeliveries get their own entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookLogEntry {
    pub request_id: RequestId,
    pub webhook_type: Gateway,
    pub event_type: String,
    pub event_id: String,
    pub status: WebhookLogStatus,
    pub error_message: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WebhookLogEntry {
    /// Creates an entry in `processing` state.
    pub fn processing(
        request_id: RequestId,
        webhook_type: Gateway,
        event_type: impl Into<String>,
        event_id: impl Into<String>,
        user_agent: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            request_id,
            webhook_type,
            event_type: event_type.into(),
            event_id: event_id.into(),
            status: WebhookLogStatus::Processing,
            error_message: None,
            user_agent,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the entry to `completed` or `failed`.
    pub fn finish(&mut self, success: bool, error_message: Option<String>, now: Timestamp) {
        self.status = WebhookLogStatus::from_success(success);
        self.error_message = error_message;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_is_processing() {
        let entry = WebhookLogEntry::processing(
            RequestId::from_string("stripe_evt_1_1_abcd1234"),
            Gateway::Stripe,
            "refund.created",
            "evt_1",
            Some("Stripe/1.0".to_string()),
            Timestamp::now(),
        );
        assert_eq!(entry.status, WebhookLogStatus::Processing);
        assert!(entry.error_message.is_none());
    }

    #[test]
    fn finish_records_failure_message() {
        let mut entry = WebhookLogEntry::processing(
            RequestId::from_string("r1"),
            Gateway::PayPal,
            "PAYMENT.CAPTURE.COMPLETED",
            "WH-1",
            None,
            Timestamp::now(),
        );

        entry.finish(false, Some("transaction not found".to_string()), Timestamp::now());

        assert_eq!(entry.status, WebhookLogStatus::Failed);
        assert_eq!(entry.error_message.as_deref(), Some("transaction not found"));
    }

    #[test]
    fn status_parses_storage_form() {
        for status in [
            WebhookLogStatus::Processing,
            WebhookLogStatus::Completed,
            WebhookLogStatus::Failed,
        ] {
            assert_eq!(WebhookLogStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(WebhookLogStatus::parse("queued").is_err());
    }
}
