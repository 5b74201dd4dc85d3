//! In-memory adapters for every storage and collaborator port.
//!
//! Used by tests and by local runs without a database.

mod ledger;
mod order_status_updater;
mod transaction_repository;
mod webhook_log_repository;

pub use ledger::{InMemoryDisputeLedger, InMemoryLedgers, InMemoryRefundLedger};
pub use order_status_updater::{InMemoryOrderStore, OrderPaymentState, OrderRecord};
pub use transaction_repository::InMemoryTransactionRepository;
pub use webhook_log_repository::InMemoryWebhookLogRepository;
