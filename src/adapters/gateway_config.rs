//! Config-backed gateway webhook settings.
//!
//! Serves `GatewayConfigSource` lookups from the `gateways` section of the
//! loaded [`AppConfig`](crate::config::AppConfig). A gateway with no webhook
//! secret in either mode is reported as unconfigured.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::config::{GatewaySettings, GatewaysConfig};
use crate::domain::foundation::DomainError;
use crate::domain::payment::Gateway;
use crate::ports::{GatewayConfigSource, GatewayWebhookConfig};

/// Static gateway configuration captured at startup.
#[derive(Debug, Clone, Default)]
pub struct ConfigGatewaySource {
    gateways: HashMap<Gateway, GatewayWebhookConfig>,
}

impl ConfigGatewaySource {
    pub fn new(config: &GatewaysConfig) -> Self {
        let gateways = Gateway::ALL
            .into_iter()
            .filter_map(|gateway| {
                webhook_config(config.settings(gateway)).map(|webhook| (gateway, webhook))
            })
            .collect();
        Self { gateways }
    }

    /// Gateways that will accept webhooks.
    pub fn configured(&self) -> Vec<Gateway> {
        Gateway::ALL
            .into_iter()
            .filter(|g| self.gateways.contains_key(g))
            .collect()
    }
}

fn webhook_config(settings: &GatewaySettings) -> Option<GatewayWebhookConfig> {
    if !settings.accepts_webhooks() {
        return None;
    }
    Some(GatewayWebhookConfig {
        mode: settings.mode,
        test_secret: settings.test_webhook_secret.clone(),
        live_secret: settings.live_webhook_secret.clone(),
    })
}

#[async_trait]
impl GatewayConfigSource for ConfigGatewaySource {
    async fn webhook_config(
        &self,
        gateway: Gateway,
    ) -> Result<Option<GatewayWebhookConfig>, DomainError> {
        Ok(self.gateways.get(&gateway).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::GatewayMode;
    use secrecy::{ExposeSecret, SecretString};

    fn secret(value: &str) -> Option<SecretString> {
        Some(SecretString::new(value.to_string()))
    }

    fn config() -> GatewaysConfig {
        GatewaysConfig {
            stripe: GatewaySettings {
                mode: GatewayMode::Live,
                test_webhook_secret: secret("whsec_test"),
                live_webhook_secret: secret("whsec_live"),
                ..Default::default()
            },
            bank_transfer: GatewaySettings {
                test_webhook_secret: secret("bank_secret"),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn returns_settings_for_configured_gateway() {
        let source = ConfigGatewaySource::new(&config());

        let stripe = source.webhook_config(Gateway::Stripe).await.unwrap().unwrap();

        assert_eq!(stripe.mode, GatewayMode::Live);
        assert_eq!(stripe.active_secret().unwrap().expose_secret(), "whsec_live");
    }

    #[tokio::test]
    async fn gateway_without_secrets_is_unconfigured() {
        let source = ConfigGatewaySource::new(&config());

        assert!(source.webhook_config(Gateway::PayPal).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keeps_mode_when_active_secret_is_missing() {
        let mut config = config();
        config.bank_transfer.mode = GatewayMode::Live;
        let source = ConfigGatewaySource::new(&config);

        let bank = source
            .webhook_config(Gateway::BankTransfer)
            .await
            .unwrap()
            .unwrap();

        assert!(bank.mode.is_live());
        assert!(bank.active_secret().is_none());
    }

    #[test]
    fn lists_configured_gateways_in_order() {
        let source = ConfigGatewaySource::new(&config());
        assert_eq!(
            source.configured(),
            vec![Gateway::Stripe, Gateway::BankTransfer]
        );
    }
}
