//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod reconciliation;
pub mod verification;
pub mod webhook;

pub use reconciliation::{
    ReconciliationEngine, ReconciliationError, ReconciliationOutcome, DEFAULT_PORT_TIMEOUT,
};
pub use verification::{
    VerificationError, VerificationResult, VerificationSource, VerifyPaymentHandler,
    VerifyPaymentQuery, VERIFICATION_FRESHNESS_SECS,
};
pub use webhook::{
    EventLog, LogHandle, ReceiveWebhookCommand, ReceiveWebhookHandler, WebhookReceipt,
    MODE_MISMATCH,
};
