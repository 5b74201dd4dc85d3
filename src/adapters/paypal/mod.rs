//! PayPal adapters.

mod status_client;

pub use status_client::{PayPalConfig, PayPalStatusClient, LIVE_BASE_URL, SANDBOX_BASE_URL};
