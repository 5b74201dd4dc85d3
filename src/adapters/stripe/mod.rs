//! Stripe adapters.

mod status_client;

pub use status_client::{StripeConfig, StripeStatusClient};
