//! ReceiveWebhookHandler - Authenticates a webhook delivery and applies it.
//!
//! Every request ends at the first applicable step:
//!
//! 1. non-POST → 405
//! 2. missing signature header → 400
//! 3. gateway configuration missing or unreadable → 500
//! 4. no secret for the active mode → 500
//! 5. signature rejected → 400
//! 6. body not a valid event → 400
//! 7. log `begin` (best effort)
//! 8. reconcile
//! 9. log `complete` (best effort)
//! 10. 200 with `processed` reporting the reconciliation outcome

use axum::http::Method;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::application::handlers::reconciliation::{ReconciliationEngine, ReconciliationOutcome};
use crate::domain::foundation::{RequestId, Timestamp};
use crate::domain::payment::Gateway;
use crate::domain::webhook::{signature, GatewayEvent, WebhookError};
use crate::ports::GatewayConfigSource;

use super::event_log::EventLog;

/// Error recorded when an event's livemode disagrees with the configured mode.
pub const MODE_MISMATCH: &str = "mode mismatch";

/// Default bound on the configuration lookup.
pub const DEFAULT_CONFIG_TIMEOUT: Duration = Duration::from_secs(5);

/// Command carrying one raw webhook delivery.
#[derive(Debug, Clone)]
pub struct ReceiveWebhookCommand {
    pub method: Method,
    /// Gateway name from the URL path.
    pub gateway: String,
    /// Signature header value, if present.
    pub signature: Option<String>,
    pub user_agent: Option<String>,
    /// Raw request body. Signatures are checked against these exact bytes.
    pub payload: Vec<u8>,
    pub received_at: Timestamp,
}

/// Response body for an authenticated delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookReceipt {
    pub received: bool,
    pub processed: bool,
    pub event_id: String,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handler for inbound gateway webhooks.
pub struct ReceiveWebhookHandler {
    config_source: Arc<dyn GatewayConfigSource>,
    engine: Arc<ReconciliationEngine>,
    event_log: EventLog,
    config_timeout: Duration,
}

impl ReceiveWebhookHandler {
    pub fn new(
        config_source: Arc<dyn GatewayConfigSource>,
        engine: Arc<ReconciliationEngine>,
        event_log: EventLog,
    ) -> Self {
        Self {
            config_source,
            engine,
            event_log,
            config_timeout: DEFAULT_CONFIG_TIMEOUT,
        }
    }

    pub fn with_config_timeout(mut self, timeout: Duration) -> Self {
        self.config_timeout = timeout;
        self
    }

    pub async fn handle(&self, cmd: ReceiveWebhookCommand) -> Result<WebhookReceipt, WebhookError> {
        // 1. Method
        if cmd.method != Method::POST {
            return Err(WebhookError::MethodNotAllowed);
        }

        // 2. Signature header
        let signature_header = cmd
            .signature
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        // 3. Gateway configuration
        let gateway: Gateway = cmd.gateway.parse().map_err(|_| {
            tracing::error!(gateway = %cmd.gateway, "Webhook received for unsupported gateway");
            WebhookError::Configuration(format!("unsupported gateway '{}'", cmd.gateway))
        })?;

        let config = match tokio::time::timeout(
            self.config_timeout,
            self.config_source.webhook_config(gateway),
        )
        .await
        {
            Ok(Ok(Some(config))) => config,
            Ok(Ok(None)) => {
                tracing::error!(gateway = %gateway, "No webhook configuration for gateway");
                return Err(WebhookError::Configuration(format!(
                    "{} is not configured",
                    gateway
                )));
            }
            Ok(Err(err)) => {
                tracing::error!(gateway = %gateway, code = %err.code, "Failed to read webhook configuration");
                return Err(WebhookError::Configuration(format!(
                    "{} configuration unreadable",
                    gateway
                )));
            }
            Err(_) => {
                tracing::error!(gateway = %gateway, "Webhook configuration lookup timed out");
                return Err(WebhookError::Configuration(format!(
                    "{} configuration lookup timed out",
                    gateway
                )));
            }
        };

        // 4. Secret for the active mode
        let secret = config.active_secret().ok_or_else(|| {
            tracing::error!(gateway = %gateway, mode = %config.mode, "Webhook secret not configured");
            WebhookError::MissingSecret {
                gateway: gateway.to_string(),
                mode: config.mode.to_string(),
            }
        })?;

        // 5. Signature
        if !signature::verify(
            signature_header,
            secret.expose_secret(),
            &cmd.payload,
            cmd.received_at,
        ) {
            tracing::warn!(gateway = %gateway, "Webhook signature rejected");
            return Err(WebhookError::InvalidSignature);
        }

        // 6. Payload
        let event = GatewayEvent::parse(gateway, &cmd.payload).map_err(|err| {
            tracing::warn!(gateway = %gateway, error = %err, "Authenticated webhook has malformed payload");
            err
        })?;

        // 7. Log
        let request_id = RequestId::derive(gateway.as_str(), &event.id, cmd.received_at);
        let handle = self
            .event_log
            .begin(
                request_id.clone(),
                gateway,
                &event.event_type,
                &event.id,
                cmd.user_agent,
            )
            .await;

        // 8. Reconcile
        let outcome = if event.livemode != config.mode.is_live() {
            tracing::warn!(
                request_id = %request_id,
                event_id = %event.id,
                gateway = %gateway,
                livemode = event.livemode,
                mode = %config.mode,
                "Webhook mode does not match gateway configuration, not applying"
            );
            ReconciliationOutcome::failure(MODE_MISMATCH)
        } else {
            self.engine.apply(&event).await
        };

        // 9. Log
        self.event_log
            .complete(handle.as_ref(), outcome.success, outcome.error.as_deref())
            .await;

        // 10. Acknowledge
        Ok(WebhookReceipt {
            received: true,
            processed: outcome.success,
            event_id: event.id,
            event_type: event.event_type,
            error: outcome.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryLedgers, InMemoryOrderStore, InMemoryTransactionRepository,
        InMemoryWebhookLogRepository,
    };
    use crate::domain::foundation::{DomainError, ErrorCode, TransactionId};
    use crate::domain::payment::{GatewayMode, PaymentTransaction, TransactionStatus};
    use crate::domain::webhook::WebhookLogStatus;
    use crate::ports::{GatewayWebhookConfig, TransactionRepository};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashMap;

    const SECRET: &str = "whsec_test_secret";

    // ══════════════════════════════════════════════════════════════
    // Test Infrastructure
    // ══════════════════════════════════════════════════════════════

    struct StaticConfig(HashMap<Gateway, GatewayWebhookConfig>);

    #[async_trait]
    impl GatewayConfigSource for StaticConfig {
        async fn webhook_config(
            &self,
            gateway: Gateway,
        ) -> Result<Option<GatewayWebhookConfig>, DomainError> {
            Ok(self.0.get(&gateway).cloned())
        }
    }

    struct BrokenConfig;

    #[async_trait]
    impl GatewayConfigSource for BrokenConfig {
        async fn webhook_config(
            &self,
            _gateway: Gateway,
        ) -> Result<Option<GatewayWebhookConfig>, DomainError> {
            Err(DomainError::new(
                ErrorCode::ConfigurationError,
                "secret=whsec_leaky is malformed",
            ))
        }
    }

    struct Harness {
        handler: ReceiveWebhookHandler,
        transactions: InMemoryTransactionRepository,
        logs: InMemoryWebhookLogRepository,
    }

    fn harness_with(config: Arc<dyn GatewayConfigSource>) -> Harness {
        let transactions = InMemoryTransactionRepository::new();
        let logs = InMemoryWebhookLogRepository::new();
        let engine = ReconciliationEngine::new(
            Arc::new(transactions.clone()),
            Arc::new(InMemoryLedgers::installed()),
            Arc::new(InMemoryOrderStore::new()),
        );
        let handler = ReceiveWebhookHandler::new(
            config,
            Arc::new(engine),
            EventLog::new(Arc::new(logs.clone())),
        );
        Harness {
            handler,
            transactions,
            logs,
        }
    }

    fn harness(mode: GatewayMode) -> Harness {
        let mut configs = HashMap::new();
        configs.insert(
            Gateway::Stripe,
            GatewayWebhookConfig::new(mode).with_test_secret(SECRET),
        );
        harness_with(Arc::new(StaticConfig(configs)))
    }

    async fn seed(h: &Harness, id: &str) {
        h.transactions
            .insert(PaymentTransaction::new(
                TransactionId::new(id).unwrap(),
                Gateway::Stripe,
                dec!(100.50),
                "usd",
                Timestamp::now(),
            ))
            .await;
    }

    fn body(event_type: &str, object: serde_json::Value, livemode: bool) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": event_type,
            "livemode": livemode,
            "data": { "object": object }
        }))
        .unwrap()
    }

    fn refund_body(tx: &str) -> Vec<u8> {
        body(
            "refund.created",
            json!({"id": "re_1", "payment_intent": tx, "amount": 5025, "currency": "usd"}),
            false,
        )
    }

    fn signed(payload: Vec<u8>) -> ReceiveWebhookCommand {
        let now = Timestamp::now();
        ReceiveWebhookCommand {
            method: Method::POST,
            gateway: "stripe".to_string(),
            signature: Some(signature::sign(SECRET, now.as_unix_secs(), &payload)),
            user_agent: Some("Stripe/1.0".to_string()),
            payload,
            received_at: now,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Rejection Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn rejects_non_post() {
        let h = harness(GatewayMode::Test);
        let mut cmd = signed(refund_body("pi_1"));
        cmd.method = Method::GET;

        let err = h.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::MethodNotAllowed));
    }

    #[tokio::test]
    async fn rejects_missing_signature() {
        let h = harness(GatewayMode::Test);
        let mut cmd = signed(refund_body("pi_1"));
        cmd.signature = None;

        let err = h.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignature));
    }

    #[tokio::test]
    async fn unsupported_gateway_is_configuration_error() {
        let h = harness(GatewayMode::Test);
        let mut cmd = signed(refund_body("pi_1"));
        cmd.gateway = "square".to_string();

        let err = h.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::Configuration(_)));
        assert_eq!(err.status_code().as_u16(), 500);
    }

    #[tokio::test]
    async fn unconfigured_gateway_is_configuration_error() {
        let h = harness(GatewayMode::Test);
        let mut cmd = signed(refund_body("pi_1"));
        cmd.gateway = "paypal".to_string();

        let err = h.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::Configuration(_)));
    }

    #[tokio::test]
    async fn unreadable_configuration_does_not_leak_values() {
        let h = harness_with(Arc::new(BrokenConfig));

        let err = h.handler.handle(signed(refund_body("pi_1"))).await.unwrap_err();

        assert!(matches!(err, WebhookError::Configuration(_)));
        assert!(!err.to_string().contains("whsec_leaky"));
    }

    #[tokio::test]
    async fn missing_secret_for_active_mode_is_server_error() {
        // Only a test secret is configured.
        let h = harness(GatewayMode::Live);

        let err = h.handler.handle(signed(refund_body("pi_1"))).await.unwrap_err();

        assert!(matches!(err, WebhookError::MissingSecret { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn rejects_wrong_secret() {
        let h = harness(GatewayMode::Test);
        let mut cmd = signed(refund_body("pi_1"));
        cmd.signature = Some(signature::sign(
            "whsec_other",
            cmd.received_at.as_unix_secs(),
            &cmd.payload,
        ));

        let err = h.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[tokio::test]
    async fn rejects_reserialized_body() {
        let h = harness(GatewayMode::Test);
        seed(&h, "pi_1").await;
        let original = br#"{"id":"evt_1","type":"refund.created","livemode":false,"data":{"object":{"id":"re_1","payment_intent":"pi_1","amount":5025,"currency":"usd"}}}"#.to_vec();
        let mut cmd = signed(original);
        cmd.payload = br#"{"type":"refund.created","id":"evt_1","livemode":false,"data":{"object":{"amount":5025,"id":"re_1","payment_intent":"pi_1","currency":"usd"}}}"#.to_vec();

        let err = h.handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
        let tx = h
            .transactions
            .find(&TransactionId::new("pi_1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn rejects_stale_timestamp() {
        let h = harness(GatewayMode::Test);
        let mut cmd = signed(refund_body("pi_1"));
        let stale = cmd.received_at.as_unix_secs() - 301;
        cmd.signature = Some(signature::sign(SECRET, stale, &cmd.payload));

        let err = h.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[tokio::test]
    async fn rejects_authentic_but_malformed_body() {
        let h = harness(GatewayMode::Test);

        let err = h
            .handler
            .handle(signed(b"not json at all".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::MalformedPayload(_)));
        assert!(h.logs.entries().await.is_empty());
    }

    // ══════════════════════════════════════════════════════════════
    // Acceptance Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn applies_authentic_event_and_logs_completion() {
        let h = harness(GatewayMode::Test);
        seed(&h, "pi_1").await;

        let receipt = h.handler.handle(signed(refund_body("pi_1"))).await.unwrap();

        assert_eq!(
            receipt,
            WebhookReceipt {
                received: true,
                processed: true,
                event_id: "evt_1".to_string(),
                event_type: "refund.created".to_string(),
                error: None,
            }
        );
        let tx = h
            .transactions
            .find(&TransactionId::new("pi_1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::PartiallyRefunded);

        let entries = h.logs.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, WebhookLogStatus::Completed);
        assert_eq!(entries[0].user_agent.as_deref(), Some("Stripe/1.0"));
    }

    #[tokio::test]
    async fn unknown_transaction_is_acknowledged_but_not_processed() {
        let h = harness(GatewayMode::Test);

        let receipt = h
            .handler
            .handle(signed(refund_body("tx_unknown")))
            .await
            .unwrap();

        assert!(receipt.received);
        assert!(!receipt.processed);
        assert!(receipt.error.unwrap().contains("tx_unknown"));
        let entries = h.logs.entries().await;
        assert_eq!(entries[0].status, WebhookLogStatus::Failed);
    }

    #[tokio::test]
    async fn livemode_mismatch_is_acknowledged_but_not_applied() {
        let h = harness(GatewayMode::Test);
        seed(&h, "pi_1").await;
        let payload = body(
            "refund.created",
            json!({"id": "re_1", "payment_intent": "pi_1", "amount": 5025, "currency": "usd"}),
            true,
        );

        let receipt = h.handler.handle(signed(payload)).await.unwrap();

        assert!(!receipt.processed);
        assert_eq!(receipt.error.as_deref(), Some(MODE_MISMATCH));
        let tx = h
            .transactions
            .find(&TransactionId::new("pi_1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.refunded_amount, rust_decimal::Decimal::ZERO);
    }

    #[tokio::test]
    async fn unhandled_event_type_is_processed() {
        let h = harness(GatewayMode::Test);

        let receipt = h
            .handler
            .handle(signed(body("customer.created", json!({"id": "cus_1"}), false)))
            .await
            .unwrap();

        assert!(receipt.processed);
        assert_eq!(receipt.event_type, "customer.created");
    }
}
