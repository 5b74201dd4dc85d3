//! Webhook ingress handlers.

mod event_log;
mod receive_webhook;

pub use event_log::{EventLog, LogHandle, DEFAULT_LOG_TIMEOUT};
pub use receive_webhook::{
    ReceiveWebhookCommand, ReceiveWebhookHandler, WebhookReceipt, DEFAULT_CONFIG_TIMEOUT,
    MODE_MISMATCH,
};
