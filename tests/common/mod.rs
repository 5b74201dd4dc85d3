//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tower::ServiceExt;

use payment_reconciler::adapters::http::{payments_router, PaymentsAppState};
use payment_reconciler::adapters::memory::{
    InMemoryLedgers, InMemoryOrderStore, InMemoryTransactionRepository,
    InMemoryWebhookLogRepository,
};
use payment_reconciler::adapters::ConfigGatewaySource;
use payment_reconciler::application::handlers::{
    EventLog, ReceiveWebhookHandler, ReconciliationEngine, VerifyPaymentHandler,
};
use payment_reconciler::config::{GatewaySettings, GatewaysConfig};
use payment_reconciler::domain::foundation::{Timestamp, TransactionId};
use payment_reconciler::domain::payment::{Gateway, PaymentTransaction};
use payment_reconciler::domain::webhook::signature;

pub const STRIPE_SECRET: &str = "whsec_integration";

/// The router plus handles on every in-memory store behind it.
pub struct TestApp {
    pub router: Router,
    pub transactions: InMemoryTransactionRepository,
    pub ledgers: InMemoryLedgers,
    pub orders: InMemoryOrderStore,
    pub logs: InMemoryWebhookLogRepository,
}

pub fn gateways() -> GatewaysConfig {
    GatewaysConfig {
        stripe: GatewaySettings {
            test_webhook_secret: Some(SecretString::new(STRIPE_SECRET.to_string())),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn test_app() -> TestApp {
    test_app_with(gateways())
}

pub fn test_app_with(config: GatewaysConfig) -> TestApp {
    let transactions = InMemoryTransactionRepository::new();
    let ledgers = InMemoryLedgers::installed();
    let orders = InMemoryOrderStore::new();
    let logs = InMemoryWebhookLogRepository::new();

    let engine = ReconciliationEngine::new(
        Arc::new(transactions.clone()),
        Arc::new(ledgers.clone()),
        Arc::new(orders.clone()),
    );
    let state = PaymentsAppState {
        webhook_handler: Arc::new(ReceiveWebhookHandler::new(
            Arc::new(ConfigGatewaySource::new(&config)),
            Arc::new(engine),
            EventLog::new(Arc::new(logs.clone())),
        )),
        verify_handler: Arc::new(VerifyPaymentHandler::new(Arc::new(transactions.clone()))),
    };

    TestApp {
        router: payments_router().with_state(state),
        transactions,
        ledgers,
        orders,
        logs,
    }
}

impl TestApp {
    pub async fn seed(&self, id: &str, gateway: Gateway, amount: Decimal, currency: &str) {
        self.transactions
            .insert(PaymentTransaction::new(
                TransactionId::new(id).unwrap(),
                gateway,
                amount,
                currency,
                Timestamp::now(),
            ))
            .await;
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

/// Builds a POST to the webhook route signed with `secret`.
pub fn signed_webhook(gateway: &str, secret: &str, payload: Vec<u8>) -> Request<Body> {
    let header = signature::sign(secret, Timestamp::now().as_unix_secs(), &payload);
    Request::builder()
        .method("POST")
        .uri(format!("/webhooks/{}", gateway))
        .header("content-type", "application/json")
        .header("x-webhook-signature", header)
        .header("user-agent", "Stripe/1.0 (+https://stripe.com/docs/webhooks)")
        .body(Body::from(payload))
        .unwrap()
}

pub fn event(id: &str, event_type: &str, object: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": id,
        "type": event_type,
        "created": Timestamp::now().as_unix_secs(),
        "livemode": false,
        "data": { "object": object }
    }))
    .unwrap()
}
