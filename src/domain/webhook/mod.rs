//! Webhook authentication, envelope parsing and delivery logging.

mod errors;
mod event;
mod log_entry;
pub mod signature;

pub use errors::WebhookError;
pub use event::{DisputeEvent, EventKind, GatewayEvent, PaymentEvent, RefundEvent};
pub use log_entry::{WebhookLogEntry, WebhookLogStatus};
pub use signature::{SignatureHeader, SignatureRejection, REPLAY_TOLERANCE_SECS};
