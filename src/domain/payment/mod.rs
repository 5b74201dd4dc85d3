//! Payment vocabulary: gateways, amounts, and the records reconciliation writes.

mod dispute;
mod gateway;
mod gateway_status;
pub mod money;
mod refund;
mod transaction;

pub use dispute::{Dispute, DisputeStatus};
pub use gateway::{Gateway, GatewayMode};
pub use gateway_status::{
    NativePaymentStatus, PayPalPaymentStatus, StripePaymentStatus, VerificationStatus,
};
pub use money::{normalize_currency, to_major_units, to_minor_units, DecimalClass};
pub use refund::{Refund, RefundStatus};
pub use transaction::{FailureStatus, PaymentTransaction, RefundApplication, TransactionStatus};
