//! Gateway-native payment status vocabularies.
//!
//! Each gateway reports payment state in its own words. Every native status
//! is mapped through an exhaustive table onto [`VerificationStatus`]; strings
//! a gateway adds later land in an `Unrecognized` variant that maps to
//! `Pending` and asks for manual review.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::gateway::Gateway;

/// Canonical tri-state answer to "has this payment gone through?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Completed,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Completed => "completed",
            VerificationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(VerificationStatus::Pending),
            "completed" => Some(VerificationStatus::Completed),
            "failed" => Some(VerificationStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stripe PaymentIntent status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripePaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    Unrecognized(String),
}

impl StripePaymentStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_confirmation" => Self::RequiresConfirmation,
            "requires_action" => Self::RequiresAction,
            "processing" => Self::Processing,
            "requires_capture" => Self::RequiresCapture,
            "canceled" => Self::Canceled,
            "succeeded" => Self::Succeeded,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::RequiresCapture => "requires_capture",
            Self::Canceled => "canceled",
            Self::Succeeded => "succeeded",
            Self::Unrecognized(s) => s,
        }
    }

    pub fn verification_status(&self) -> VerificationStatus {
        match self {
            Self::RequiresPaymentMethod
            | Self::RequiresConfirmation
            | Self::RequiresAction
            | Self::Processing
            | Self::RequiresCapture
            | Self::Unrecognized(_) => VerificationStatus::Pending,
            Self::Canceled => VerificationStatus::Failed,
            Self::Succeeded => VerificationStatus::Completed,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::RequiresPaymentMethod => {
                "No usable payment method yet; ask the customer to enter or replace their card"
            }
            Self::RequiresConfirmation => "Payment is awaiting confirmation by the customer",
            Self::RequiresAction => {
                "Customer must complete additional authentication (e.g. 3-D Secure)"
            }
            Self::Processing => "Payment is processing; check again in a few minutes",
            Self::RequiresCapture => "Funds are authorized; capture the payment to complete it",
            Self::Canceled => "Payment was canceled; start a new payment attempt",
            Self::Succeeded => "Payment completed; no action needed",
            Self::Unrecognized(_) => "Unrecognized gateway status; review the payment manually",
        }
    }
}

/// PayPal order status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayPalPaymentStatus {
    Created,
    Saved,
    Approved,
    PayerActionRequired,
    Completed,
    Voided,
    Declined,
    Failed,
    Refunded,
    PartiallyRefunded,
    Unrecognized(String),
}

impl PayPalPaymentStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "CREATED" => Self::Created,
            "SAVED" => Self::Saved,
            "APPROVED" => Self::Approved,
            "PAYER_ACTION_REQUIRED" => Self::PayerActionRequired,
            "COMPLETED" => Self::Completed,
            "VOIDED" => Self::Voided,
            "DECLINED" => Self::Declined,
            "FAILED" => Self::Failed,
            "REFUNDED" => Self::Refunded,
            "PARTIALLY_REFUNDED" => Self::PartiallyRefunded,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "CREATED",
            Self::Saved => "SAVED",
            Self::Approved => "APPROVED",
            Self::PayerActionRequired => "PAYER_ACTION_REQUIRED",
            Self::Completed => "COMPLETED",
            Self::Voided => "VOIDED",
            Self::Declined => "DECLINED",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
            Self::PartiallyRefunded => "PARTIALLY_REFUNDED",
            Self::Unrecognized(s) => s,
        }
    }

    pub fn verification_status(&self) -> VerificationStatus {
        match self {
            Self::Created
            | Self::Saved
            | Self::Approved
            | Self::PayerActionRequired
            | Self::Unrecognized(_) => VerificationStatus::Pending,
            Self::Completed | Self::Refunded | Self::PartiallyRefunded => {
                VerificationStatus::Completed
            }
            Self::Voided | Self::Declined | Self::Failed => VerificationStatus::Failed,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Created | Self::Saved => "Order created; waiting for the payer to approve it",
            Self::Approved => "Payer approved the order; capture it to complete the payment",
            Self::PayerActionRequired => "Payer must complete an additional step at PayPal",
            Self::Completed => "Payment completed; no action needed",
            Self::Voided => "Order was voided; start a new payment attempt",
            Self::Declined | Self::Failed => {
                "Payment was declined; ask the customer to use another funding source"
            }
            Self::Refunded => "Payment completed and was fully refunded",
            Self::PartiallyRefunded => "Payment completed and was partially refunded",
            Self::Unrecognized(_) => "Unrecognized gateway status; review the payment manually",
        }
    }
}

/// A native status tagged with the gateway that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativePaymentStatus {
    Stripe(StripePaymentStatus),
    PayPal(PayPalPaymentStatus),
}

impl NativePaymentStatus {
    /// Parses a native status for gateways with a query API.
    pub fn parse(gateway: Gateway, native: &str) -> Option<Self> {
        match gateway {
            Gateway::Stripe => Some(Self::Stripe(StripePaymentStatus::parse(native))),
            Gateway::PayPal => Some(Self::PayPal(PayPalPaymentStatus::parse(native))),
            Gateway::BankTransfer => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stripe(s) => s.as_str(),
            Self::PayPal(s) => s.as_str(),
        }
    }

    pub fn verification_status(&self) -> VerificationStatus {
        match self {
            Self::Stripe(s) => s.verification_status(),
            Self::PayPal(s) => s.verification_status(),
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Stripe(s) => s.recommendation(),
            Self::PayPal(s) => s.recommendation(),
        }
    }

    pub fn is_unrecognized(&self) -> bool {
        matches!(
            self,
            Self::Stripe(StripePaymentStatus::Unrecognized(_))
                | Self::PayPal(PayPalPaymentStatus::Unrecognized(_))
        )
    }
}
