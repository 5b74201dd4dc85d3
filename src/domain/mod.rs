//! Domain layer containing business rules and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (identifiers, timestamps, errors)
//! - `payment` - Gateways, amounts, transactions, refunds and disputes
//! - `webhook` - Signature verification, event envelope and delivery log

pub mod foundation;
pub mod payment;
pub mod webhook;
