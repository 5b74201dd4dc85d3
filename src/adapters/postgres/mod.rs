//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresTransactionRepository` - Payment transactions with atomic refund accumulation
//! - `PostgresLedgers` - Probes for the optional refund and dispute ledgers
//! - `PostgresWebhookLogRepository` - Delivery audit trail
//! - `PostgresOrderStatusUpdater` - Order payment state

mod ledger;
mod order_status_updater;
mod transaction_repository;
mod webhook_log_repository;

pub use ledger::{PostgresDisputeLedger, PostgresLedgers, PostgresRefundLedger};
pub use order_status_updater::PostgresOrderStatusUpdater;
pub use transaction_repository::PostgresTransactionRepository;
pub use webhook_log_repository::PostgresWebhookLogRepository;
