//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `TransactionRepository` - Canonical payment transactions
//! - `RefundLedger` / `DisputeLedger` - Optional ledgers, probed via `LedgerCapabilities`
//! - `WebhookLogRepository` - Delivery audit trail
//!
//! ## Collaborator Ports
//!
//! - `OrderStatusUpdater` - Mark orders paid or revert them
//! - `GatewayConfigSource` - Per-gateway webhook secret and mode
//! - `PaymentStatusQuery` - Gateway "retrieve payment" APIs

mod gateway_config_source;
mod ledger;
mod order_status_updater;
mod payment_status_query;
mod transaction_repository;
mod webhook_log_repository;

pub use gateway_config_source::{GatewayConfigSource, GatewayWebhookConfig};
pub use ledger::{DisputeLedger, LedgerCapabilities, RefundLedger};
pub use order_status_updater::OrderStatusUpdater;
pub use payment_status_query::{
    GatewayError, GatewayErrorCode, GatewayPayment, GatewaySession, PaymentStatusQuery,
};
pub use transaction_repository::TransactionRepository;
pub use webhook_log_repository::WebhookLogRepository;
