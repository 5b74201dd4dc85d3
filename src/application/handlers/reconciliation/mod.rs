//! Reconciliation engine.
//!
//! One handler per event category. Every handler returns a
//! [`ReconciliationOutcome`]; failures are reported, never raised.

mod dispute;
mod engine;
mod outcome;
mod payment;
mod refund;

pub use engine::{ReconciliationEngine, DEFAULT_PORT_TIMEOUT};
pub use outcome::{ReconciliationError, ReconciliationOutcome};
