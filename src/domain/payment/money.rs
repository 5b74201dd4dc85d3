//! Amount normalizer.
//!
//! Gateways report amounts as integers in the currency's minor unit; the
//! canonical records hold decimal major-unit amounts. Conversion depends only
//! on the currency's decimal class, so every function here is pure and total.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Currencies whose minor unit equals the major unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// Currencies with a thousandth minor unit.
const THREE_DECIMAL_CURRENCIES: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

/// Decimal class of a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalClass {
    Zero,
    Two,
    Three,
}

impl DecimalClass {
    /// Classifies an ISO-like currency code. Unknown codes are two-decimal.
    pub fn of(currency: &str) -> Self {
        let code = currency.trim().to_ascii_uppercase();
        if ZERO_DECIMAL_CURRENCIES.contains(&code.as_str()) {
            DecimalClass::Zero
        } else if THREE_DECIMAL_CURRENCIES.contains(&code.as_str()) {
            DecimalClass::Three
        } else {
            DecimalClass::Two
        }
    }

    /// Number of decimal places in the major unit.
    pub fn places(&self) -> u32 {
        match self {
            DecimalClass::Zero => 0,
            DecimalClass::Two => 2,
            DecimalClass::Three => 3,
        }
    }

    fn factor(&self) -> Decimal {
        Decimal::from(10_i64.pow(self.places()))
    }
}

/// Normalizes a currency code to upper case.
pub fn normalize_currency(currency: &str) -> String {
    currency.trim().to_ascii_uppercase()
}

/// Converts a major-unit amount into the currency's minor units.
///
/// Sub-minor precision is rounded half away from zero. Values beyond the
/// `i64` range saturate.
pub fn to_minor_units(amount: Decimal, currency: &str) -> i64 {
    let class = DecimalClass::of(currency);
    let saturated = if amount.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    };

    amount
        .checked_mul(class.factor())
        .map(|minor| minor.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|minor| minor.to_i64())
        .unwrap_or(saturated)
}

/// Converts a minor-unit integer into a major-unit decimal amount.
pub fn to_major_units(amount: i64, currency: &str) -> Decimal {
    Decimal::new(amount, DecimalClass::of(currency).places())
}
