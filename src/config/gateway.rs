//! Payment gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::payment::{Gateway, GatewayMode};

use super::error::ValidationError;

/// Settings for every supported gateway
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaysConfig {
    #[serde(default)]
    pub stripe: GatewaySettings,

    #[serde(default)]
    pub paypal: GatewaySettings,

    #[serde(default)]
    pub bank_transfer: GatewaySettings,

    /// Upper bound on a single gateway status query, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Settings for one gateway
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySettings {
    /// Whether the account moves test or live money
    #[serde(default)]
    pub mode: GatewayMode,

    /// Webhook signing secret used in test mode
    pub test_webhook_secret: Option<SecretString>,

    /// Webhook signing secret used in live mode
    pub live_webhook_secret: Option<SecretString>,

    /// Secret API key (Stripe)
    pub api_key: Option<SecretString>,

    /// OAuth client id (PayPal)
    pub client_id: Option<String>,

    /// OAuth client secret (PayPal)
    pub client_secret: Option<SecretString>,

    /// Override for the gateway API host
    pub api_base_url: Option<String>,
}

impl GatewaysConfig {
    /// Settings for the given gateway
    pub fn settings(&self, gateway: Gateway) -> &GatewaySettings {
        match gateway {
            Gateway::Stripe => &self.stripe,
            Gateway::PayPal => &self.paypal,
            Gateway::BankTransfer => &self.bank_transfer,
        }
    }

    /// Get the gateway query bound as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }

        for gateway in Gateway::ALL {
            self.settings(gateway).validate(gateway)?;
        }

        if let Some(key) = self.stripe.api_key.as_ref() {
            let key = key.expose_secret();
            if !key.starts_with("sk_") && !key.starts_with("rk_") {
                return Err(ValidationError::InvalidStripeKey);
            }
        }

        if self.paypal.client_secret.is_some() && self.paypal.client_id.is_none() {
            return Err(ValidationError::MissingRequired("GATEWAYS__PAYPAL__CLIENT_ID"));
        }

        Ok(())
    }
}

impl Default for GatewaysConfig {
    fn default() -> Self {
        Self {
            stripe: GatewaySettings::default(),
            paypal: GatewaySettings::default(),
            bank_transfer: GatewaySettings::default(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl GatewaySettings {
    /// Whether any webhook secret was supplied for this gateway
    pub fn accepts_webhooks(&self) -> bool {
        non_blank(&self.test_webhook_secret) || non_blank(&self.live_webhook_secret)
    }

    /// Webhook secret for the configured mode
    pub fn active_webhook_secret(&self) -> Option<&SecretString> {
        let secret = match self.mode {
            GatewayMode::Test => self.test_webhook_secret.as_ref(),
            GatewayMode::Live => self.live_webhook_secret.as_ref(),
        };
        secret.filter(|s| !s.expose_secret().trim().is_empty())
    }

    fn validate(&self, gateway: Gateway) -> Result<(), ValidationError> {
        if self.accepts_webhooks() && self.active_webhook_secret().is_none() {
            return Err(ValidationError::MissingWebhookSecret {
                gateway: gateway.as_str(),
                mode: self.mode.as_str(),
            });
        }
        if let Some(url) = self.api_base_url.as_deref() {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ValidationError::InvalidBaseUrl(gateway.as_str()));
            }
        }
        Ok(())
    }
}

fn non_blank(secret: &Option<SecretString>) -> bool {
    secret
        .as_ref()
        .is_some_and(|s| !s.expose_secret().trim().is_empty())
}

fn default_request_timeout() -> u64 {
    15
}
