//! Payment Reconciler - Gateway webhook reconciliation service
//!
//! Authenticates inbound payment gateway webhooks, applies them exactly once
//! to transaction, refund and dispute records, and offers a pull-based
//! verification path against the gateways' own APIs.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
