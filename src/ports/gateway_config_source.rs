//! GatewayConfigSource port - Per-gateway webhook configuration lookup.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::DomainError;
use crate::domain::payment::{Gateway, GatewayMode};

/// Webhook settings for one gateway.
#[derive(Clone)]
pub struct GatewayWebhookConfig {
    pub mode: GatewayMode,
    pub test_secret: Option<SecretString>,
    pub live_secret: Option<SecretString>,
}

impl GatewayWebhookConfig {
    pub fn new(mode: GatewayMode) -> Self {
        Self {
            mode,
            test_secret: None,
            live_secret: None,
        }
    }

    pub fn with_test_secret(mut self, secret: impl Into<String>) -> Self {
        self.test_secret = Some(SecretString::new(secret.into()));
        self
    }

    pub fn with_live_secret(mut self, secret: impl Into<String>) -> Self {
        self.live_secret = Some(SecretString::new(secret.into()));
        self
    }

    /// Secret for the active mode. Blank secrets count as missing.
    pub fn active_secret(&self) -> Option<&SecretString> {
        let secret = match self.mode {
            GatewayMode::Test => self.test_secret.as_ref(),
            GatewayMode::Live => self.live_secret.as_ref(),
        };
        secret.filter(|s| !s.expose_secret().trim().is_empty())
    }
}

impl std::fmt::Debug for GatewayWebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayWebhookConfig")
            .field("mode", &self.mode)
            .field("test_secret", &self.test_secret.as_ref().map(|_| "[REDACTED]"))
            .field("live_secret", &self.live_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Port for looking up webhook configuration by gateway.
#[async_trait]
pub trait GatewayConfigSource: Send + Sync {
    /// Returns `Ok(None)` when the gateway is not configured and `Err` when
    /// the configuration cannot be read.
    async fn webhook_config(
        &self,
        gateway: Gateway,
    ) -> Result<Option<GatewayWebhookConfig>, DomainError>;
}
