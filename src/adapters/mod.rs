//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routes for webhook ingress and verification
//! - `postgres` - sqlx-backed storage
//! - `memory` - In-memory storage for tests and local runs
//! - `stripe` / `paypal` - Gateway status query clients
//! - `gateway_config` - Webhook settings served from loaded configuration

pub mod gateway_config;
pub mod http;
pub mod memory;
pub mod paypal;
pub mod postgres;
pub mod stripe;

pub use gateway_config::ConfigGatewaySource;
