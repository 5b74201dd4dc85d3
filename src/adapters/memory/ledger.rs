//! In-memory refund and dispute ledgers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::domain::payment::{Dispute, Refund};
use crate::ports::{DisputeLedger, LedgerCapabilities, RefundLedger};

#[derive(Debug, Clone, Default)]
pub struct InMemoryRefundLedger {
    refunds: Arc<RwLock<HashMap<String, Refund>>>,
}

impl InMemoryRefundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.refunds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.refunds.read().await.is_empty()
    }
}

#[async_trait]
impl RefundLedger for InMemoryRefundLedger {
    async fn upsert(&self, refund: &Refund) -> Result<Refund, DomainError> {
        let mut refunds = self.refunds.write().await;
        let stored = match refunds.get_mut(&refund.refund_id) {
            Some(existing) => {
                existing.merge(refund.clone());
                existing.clone()
            }
            None => {
                refunds.insert(refund.refund_id.clone(), refund.clone());
                refund.clone()
            }
        };
        Ok(stored)
    }

    async fn find(&self, refund_id: &str) -> Result<Option<Refund>, DomainError> {
        Ok(self.refunds.read().await.get(refund_id).cloned())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDisputeLedger {
    disputes: Arc<RwLock<HashMap<String, Dispute>>>,
}

impl InMemoryDisputeLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DisputeLedger for InMemoryDisputeLedger {
    async fn upsert(&self, dispute: &Dispute) -> Result<Dispute, DomainError> {
        let mut disputes = self.disputes.write().await;
        let stored = match disputes.get_mut(&dispute.dispute_id) {
            Some(existing) => {
                existing.merge(dispute.clone());
                existing.clone()
            }
            None => {
                disputes.insert(dispute.dispute_id.clone(), dispute.clone());
                dispute.clone()
            }
        };
        Ok(stored)
    }

    async fn find(&self, dispute_id: &str) -> Result<Option<Dispute>, DomainError> {
        Ok(self.disputes.read().await.get(dispute_id).cloned())
    }
}

/// Ledger capabilities backed by optional in-memory ledgers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgers {
    refunds: Option<Arc<InMemoryRefundLedger>>,
    disputes: Option<Arc<InMemoryDisputeLedger>>,
}

impl InMemoryLedgers {
    /// A deployment with both ledgers installed.
    pub fn installed() -> Self {
        Self {
            refunds: Some(Arc::new(InMemoryRefundLedger::new())),
            disputes: Some(Arc::new(InMemoryDisputeLedger::new())),
        }
    }

    /// A deployment without ledgers.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn refunds(&self) -> Option<Arc<InMemoryRefundLedger>> {
        self.refunds.clone()
    }

    pub fn disputes(&self) -> Option<Arc<InMemoryDisputeLedger>> {
        self.disputes.clone()
    }
}

#[async_trait]
impl LedgerCapabilities for InMemoryLedgers {
    async fn refund_ledger(&self) -> Result<Option<Arc<dyn RefundLedger>>, DomainError> {
        Ok(self
            .refunds
            .clone()
            .map(|ledger| ledger as Arc<dyn RefundLedger>))
    }

    async fn dispute_ledger(&self) -> Result<Option<Arc<dyn DisputeLedger>>, DomainError> {
        Ok(self
            .disputes
            .clone()
            .map(|ledger| ledger as Arc<dyn DisputeLedger>))
    }
}
