//! Gateway event envelope.
//!
//! Every gateway's webhook body is read through one envelope:
//! `{ id, type, created?, livemode?, data: { object } }`. The gateway-native
//! `type` is classified through a per-gateway table into an [`EventKind`]
//! carrying the typed object the reconciliation engine needs. Amounts stay in
//! minor units here.

use serde::{Deserialize, Deserializer};

use crate::domain::foundation::{OrderId, Timestamp, TransactionId};
use crate::domain::payment::{FailureStatus, Gateway};

use super::errors::WebhookError;

/// A verified, parsed webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub gateway: Gateway,
    /// Gateway event id (`evt_...`).
    pub id: String,
    /// Gateway-native event type, as sent.
    pub event_type: String,
    pub created: Option<Timestamp>,
    pub livemode: bool,
    pub kind: EventKind,
    /// The `data.object` payload, kept as the last-known gateway response.
    pub object: serde_json::Value,
}

/// What an event asks the reconciliation engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    PaymentSucceeded(PaymentEvent),
    PaymentFailed {
        payment: PaymentEvent,
        outcome: FailureStatus,
    },
    RefundSucceeded(RefundEvent),
    RefundFailed(RefundEvent),
    DisputeCreated(DisputeEvent),
    DisputeUpdated(DisputeEvent),
    /// No handler is registered for this type.
    Unhandled,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PaymentSucceeded(_) => "payment_succeeded",
            EventKind::PaymentFailed {
                outcome: FailureStatus::Failed,
                ..
            } => "payment_failed",
            EventKind::PaymentFailed {
                outcome: FailureStatus::Cancelled,
                ..
            } => "payment_cancelled",
            EventKind::RefundSucceeded(_) => "refund_succeeded",
            EventKind::RefundFailed(_) => "refund_failed",
            EventKind::DisputeCreated(_) => "dispute_created",
            EventKind::DisputeUpdated(_) => "dispute_updated",
            EventKind::Unhandled => "unhandled",
        }
    }

    /// Transaction the event applies to, if any.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            EventKind::PaymentSucceeded(p) | EventKind::PaymentFailed { payment: p, .. } => {
                Some(&p.transaction_id)
            }
            EventKind::RefundSucceeded(r) | EventKind::RefundFailed(r) => Some(&r.transaction_id),
            EventKind::DisputeCreated(d) | EventKind::DisputeUpdated(d) => Some(&d.transaction_id),
            EventKind::Unhandled => None,
        }
    }
}

/// Payment outcome carried by a payment event.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEvent {
    pub transaction_id: TransactionId,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub order_ids: Vec<OrderId>,
    pub failure_reason: Option<String>,
}

/// Refund carried by a refund event.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundEvent {
    pub refund_id: String,
    pub transaction_id: TransactionId,
    pub amount_minor: i64,
    pub currency: String,
    pub reason: Option<String>,
    pub failure_reason: Option<String>,
}

/// Dispute carried by a dispute event. `status` is gateway vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeEvent {
    pub dispute_id: String,
    pub transaction_id: TransactionId,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub reason: Option<String>,
    pub evidence_due_by: Option<Timestamp>,
}

// ──────────────────────────────────────────────────────────────────
// Wire format
// ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    livemode: bool,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WirePayment {
    id: String,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: Option<WireMetadata>,
    #[serde(default)]
    failure_message: Option<String>,
    #[serde(default)]
    last_payment_error: Option<WirePaymentError>,
    #[serde(default)]
    cancellation_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireMetadata {
    #[serde(default, alias = "quote_ids", deserialize_with = "order_id_list")]
    order_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WirePaymentError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRefund {
    id: String,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    transaction_id: Option<String>,
    amount: i64,
    currency: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDispute {
    id: String,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    transaction_id: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    evidence_details: Option<WireEvidence>,
}

#[derive(Debug, Deserialize)]
struct WireEvidence {
    #[serde(default)]
    due_by: Option<i64>,
}

/// Accepts `["a","b"]`, `"a,b"` or `null`.
fn order_id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Raw::List(ids)) => ids,
        Some(Raw::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
    })
}

// ──────────────────────────────────────────────────────────────────
// Classification
// ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    PaymentSucceeded,
    PaymentFailed,
    PaymentCancelled,
    RefundSucceeded,
    RefundFailed,
    /// Refund update whose outcome is in the object's `status`.
    RefundUpdated,
    DisputeCreated,
    DisputeUpdated,
    Unhandled,
}

fn categorize(gateway: Gateway, event_type: &str) -> Category {
    match gateway {
        Gateway::Stripe | Gateway::BankTransfer => match event_type {
            "payment_intent.succeeded" => Category::PaymentSucceeded,
            "payment_intent.payment_failed" => Category::PaymentFailed,
            "payment_intent.canceled" => Category::PaymentCancelled,
            "refund.created" => Category::RefundSucceeded,
            "charge.refund.updated" => Category::RefundUpdated,
            "refund.failed" => Category::RefundFailed,
            "charge.dispute.created" => Category::DisputeCreated,
            "charge.dispute.updated" | "charge.dispute.closed" => Category::DisputeUpdated,
            _ => Category::Unhandled,
        },
        Gateway::PayPal => match event_type {
            "PAYMENT.CAPTURE.COMPLETED" => Category::PaymentSucceeded,
            "PAYMENT.CAPTURE.DENIED" => Category::PaymentFailed,
            "PAYMENT.CAPTURE.REVERSED" => Category::PaymentCancelled,
            "PAYMENT.CAPTURE.REFUNDED" => Category::RefundSucceeded,
            "PAYMENT.REFUND.FAILED" => Category::RefundFailed,
            "CUSTOMER.DISPUTE.CREATED" => Category::DisputeCreated,
            "CUSTOMER.DISPUTE.UPDATED" | "CUSTOMER.DISPUTE.RESOLVED" => Category::DisputeUpdated,
            _ => Category::Unhandled,
        },
    }
}

fn malformed(err: impl std::fmt::Display) -> WebhookError {
    WebhookError::MalformedPayload(err.to_string())
}

fn deserialize_object<T: serde::de::DeserializeOwned>(value: &serde_json::Value) -> Result<T, WebhookError> {
    T::deserialize(value).map_err(malformed)
}

fn owning_transaction(
    payment_intent: Option<String>,
    transaction_id: Option<String>,
) -> Result<TransactionId, WebhookError> {
    let id = payment_intent
        .or(transaction_id)
        .ok_or_else(|| malformed("object has no owning transaction"))?;
    TransactionId::new(id).map_err(malformed)
}

fn non_empty(field: &str, value: String) -> Result<String, WebhookError> {
    if value.trim().is_empty() {
        return Err(malformed(format!("{} is empty", field)));
    }
    Ok(value)
}

impl PaymentEvent {
    fn from_object(value: &serde_json::Value) -> Result<Self, WebhookError> {
        let wire: WirePayment = deserialize_object(value)?;
        let failure_reason = wire
            .last_payment_error
            .and_then(|e| e.message)
            .or(wire.failure_message)
            .or(wire.cancellation_reason);
        let order_ids = wire
            .metadata
            .unwrap_or_default()
            .order_ids
            .into_iter()
            .filter_map(|id| OrderId::new(id).ok())
            .collect();

        Ok(PaymentEvent {
            transaction_id: TransactionId::new(wire.id).map_err(malformed)?,
            amount_minor: wire.amount,
            currency: wire.currency,
            order_ids,
            failure_reason,
        })
    }
}

impl RefundEvent {
    fn from_wire(wire: WireRefund) -> Result<Self, WebhookError> {
        Ok(RefundEvent {
            refund_id: non_empty("refund id", wire.id)?,
            transaction_id: owning_transaction(wire.payment_intent, wire.transaction_id)?,
            amount_minor: wire.amount,
            currency: wire.currency,
            reason: wire.reason,
            failure_reason: wire.failure_reason,
        })
    }
}

impl DisputeEvent {
    fn from_object(value: &serde_json::Value) -> Result<Self, WebhookError> {
        let wire: WireDispute = deserialize_object(value)?;
        Ok(DisputeEvent {
            dispute_id: non_empty("dispute id", wire.id)?,
            transaction_id: owning_transaction(wire.payment_intent, wire.transaction_id)?,
            amount_minor: wire.amount,
            currency: wire.currency,
            status: wire.status,
            reason: wire.reason,
            evidence_due_by: wire
                .evidence_details
                .and_then(|e| e.due_by)
                .and_then(Timestamp::from_unix_secs),
        })
    }
}

impl GatewayEvent {
    /// Parses a raw webhook body for `gateway`.
    ///
    /// Fails with [`WebhookError::MalformedPayload`] when the envelope, or the
    /// object of a handled event type, does not have the expected shape.
    /// Unhandled types only need a valid envelope.
    pub fn parse(gateway: Gateway, raw: &[u8]) -> Result<Self, WebhookError> {
        let envelope: Envelope = serde_json::from_slice(raw).map_err(malformed)?;
        if envelope.id.trim().is_empty() {
            return Err(malformed("event id is empty"));
        }

        let object = envelope.data.object;
        let kind = match categorize(gateway, &envelope.event_type) {
            Category::PaymentSucceeded => EventKind::PaymentSucceeded(PaymentEvent::from_object(&object)?),
            Category::PaymentFailed => EventKind::PaymentFailed {
                payment: PaymentEvent::from_object(&object)?,
                outcome: FailureStatus::Failed,
            },
            Category::PaymentCancelled => EventKind::PaymentFailed {
                payment: PaymentEvent::from_object(&object)?,
                outcome: FailureStatus::Cancelled,
            },
            Category::RefundSucceeded => {
                EventKind::RefundSucceeded(RefundEvent::from_wire(deserialize_object(&object)?)?)
            }
            Category::RefundFailed => EventKind::RefundFailed(RefundEvent::from_wire(deserialize_object(&object)?)?),
            Category::RefundUpdated => {
                let wire: WireRefund = deserialize_object(&object)?;
                match wire.status.as_deref() {
                    Some("succeeded") => EventKind::RefundSucceeded(RefundEvent::from_wire(wire)?),
                    Some("failed") | Some("canceled") => {
                        EventKind::RefundFailed(RefundEvent::from_wire(wire)?)
                    }
                    _ => EventKind::Unhandled,
                }
            }
            Category::DisputeCreated => EventKind::DisputeCreated(DisputeEvent::from_object(&object)?),
            Category::DisputeUpdated => EventKind::DisputeUpdated(DisputeEvent::from_object(&object)?),
            Category::Unhandled => EventKind::Unhandled,
        };

        Ok(GatewayEvent {
            gateway,
            id: envelope.id,
            event_type: envelope.event_type,
            created: envelope.created.and_then(Timestamp::from_unix_secs),
            livemode: envelope.livemode,
            kind,
            object,
        })
    }
}
