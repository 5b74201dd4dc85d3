//! Integration tests for `POST /payments/verify`.
//!
//! Covers the paths that need no live gateway: bank transfers answered from
//! the stored record, recent verifications served from the transaction, and
//! request validation.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;

use payment_reconciler::domain::foundation::{Timestamp, TransactionId};
use payment_reconciler::domain::payment::{Gateway, VerificationStatus};
use payment_reconciler::ports::TransactionRepository;

use common::test_app;

fn verify_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/payments/verify")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// Bank transfer fallback
// =============================================================================

#[tokio::test]
async fn bank_transfer_without_record_is_pending_with_hint() {
    let app = test_app();

    let (status, body) = app
        .send(verify_request(json!({
            "transactionId": "bt_missing",
            "gateway": "bank_transfer"
        })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["source"], "none");
    assert_eq!(body["cached"], false);
    let hints = body["recommendations"].as_array().unwrap();
    assert!(hints
        .iter()
        .any(|h| h.as_str().unwrap().contains("proof of payment")));
}

#[tokio::test]
async fn bank_transfer_reads_stored_record_and_cross_checks() {
    let app = test_app();
    app.seed("bt_1", Gateway::BankTransfer, dec!(250.00), "eur").await;

    let (status, body) = app
        .send(verify_request(json!({
            "transactionId": "bt_1",
            "gateway": "bank_transfer",
            "expectedAmount": "249.99",
            "expectedCurrency": "EUR"
        })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["source"], "stored_record");
    assert_eq!(body["amountMatches"], false);
    assert_eq!(body["currencyMatches"], true);
}

// =============================================================================
// Cached verification
// =============================================================================

#[tokio::test]
async fn recent_verification_is_served_without_gateway_client() {
    let app = test_app();
    app.seed("pi_1", Gateway::Stripe, dec!(10.00), "usd").await;
    app.transactions
        .record_verification(
            &TransactionId::new("pi_1").unwrap(),
            VerificationStatus::Completed,
            Timestamp::now(),
        )
        .await
        .unwrap();

    let (status, body) = app
        .send(verify_request(json!({"transactionId": "pi_1", "gateway": "stripe"})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["cached"], true);
    assert_eq!(body["source"], "cache");
}

#[tokio::test]
async fn force_refresh_without_client_is_unavailable() {
    let app = test_app();
    app.seed("pi_1", Gateway::Stripe, dec!(10.00), "usd").await;
    app.transactions
        .record_verification(
            &TransactionId::new("pi_1").unwrap(),
            VerificationStatus::Completed,
            Timestamp::now(),
        )
        .await
        .unwrap();

    let (status, body) = app
        .send(verify_request(json!({
            "transactionId": "pi_1",
            "gateway": "stripe",
            "forceRefresh": true
        })))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_code"], "GATEWAY_NOT_CONFIGURED");
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn unknown_gateway_is_bad_request() {
    let app = test_app();

    let (status, body) = app
        .send(verify_request(json!({"transactionId": "x_1", "gateway": "square"})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/payments/verify")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_is_ok() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
