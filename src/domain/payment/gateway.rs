//! Supported payment processors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// A payment processor that emits webhooks and owns transaction ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gateway {
    Stripe,
    #[serde(rename = "paypal")]
    PayPal,
    BankTransfer,
}

impl Gateway {
    /// All supported gateways.
    pub const ALL: [Gateway; 3] = [Gateway::Stripe, Gateway::PayPal, Gateway::BankTransfer];

    /// Stable lowercase name used in URLs, config keys and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gateway::Stripe => "stripe",
            Gateway::PayPal => "paypal",
            Gateway::BankTransfer => "bank_transfer",
        }
    }

    /// Whether the processor exposes a "retrieve payment by id" API.
    ///
    /// Manual bank transfers have no query API; verification falls back to
    /// the stored transaction record.
    pub fn supports_status_query(&self) -> bool {
        !matches!(self, Gateway::BankTransfer)
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gateway {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Gateway::Stripe),
            "paypal" => Ok(Gateway::PayPal),
            "bank_transfer" | "bank-transfer" | "banktransfer" => Ok(Gateway::BankTransfer),
            other => Err(ValidationError::invalid_format(
                "gateway",
                format!("unsupported gateway '{}'", other),
            )),
        }
    }
}

/// Whether a gateway account is operating against test or live money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    Test,
    Live,
}

impl GatewayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayMode::Test => "test",
            GatewayMode::Live => "live",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, GatewayMode::Live)
    }
}

impl fmt::Display for GatewayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
