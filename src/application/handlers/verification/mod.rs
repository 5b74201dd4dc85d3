//! Payment verification handlers.

mod verify_payment;

pub use verify_payment::{
    VerificationError, VerificationResult, VerificationSource, VerifyPaymentHandler,
    VerifyPaymentQuery, DEFAULT_GATEWAY_TIMEOUT, VERIFICATION_FRESHNESS_SECS,
};
