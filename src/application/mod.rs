//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Webhook ingress is the command side; payment verification is a query.

pub mod handlers;

pub use handlers::{
    // Reconciliation
    ReconciliationEngine, ReconciliationError, ReconciliationOutcome,
    // Webhook ingress
    EventLog, LogHandle, ReceiveWebhookCommand, ReceiveWebhookHandler, WebhookReceipt,
    // Verification
    VerificationError, VerificationResult, VerificationSource, VerifyPaymentHandler,
    VerifyPaymentQuery,
};
