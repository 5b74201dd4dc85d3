//! Refund and dispute ledger ports.
//!
//! Ledgers are an optional deployment capability. The engine asks
//! [`LedgerCapabilities`] whether a ledger exists before writing to it, so
//! "ledger not installed" is never confused with "ledger write failed".

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::payment::{Dispute, Refund};

/// Port for the refund ledger.
#[async_trait]
pub trait RefundLedger: Send + Sync {
    /// Insert the refund, or merge it into the existing record with the same id.
    async fn upsert(&self, refund: &Refund) -> Result<Refund, DomainError>;

    /// Find a refund by gateway refund id.
    async fn find(&self, refund_id: &str) -> Result<Option<Refund>, DomainError>;
}

/// Port for the dispute ledger.
#[async_trait]
pub trait DisputeLedger: Send + Sync {
    /// Insert the dispute, or merge it into the existing record with the same id.
    ///
    /// A closed dispute keeps its outcome when a stale update arrives.
    async fn upsert(&self, dispute: &Dispute) -> Result<Dispute, DomainError>;

    /// Find a dispute by gateway dispute id.
    async fn find(&self, dispute_id: &str) -> Result<Option<Dispute>, DomainError>;
}

/// Probe for optional ledgers.
#[async_trait]
pub trait LedgerCapabilities: Send + Sync {
    /// The refund ledger, if this deployment has one.
    async fn refund_ledger(&self) -> Result<Option<Arc<dyn RefundLedger>>, DomainError>;

    /// The dispute ledger, if this deployment has one.
    async fn dispute_ledger(&self) -> Result<Option<Arc<dyn DisputeLedger>>, DomainError>;
}
