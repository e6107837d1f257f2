//! PayPal webhook event envelope and the resource fields this service reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PAYMENT_CAPTURE_COMPLETED: &str = "PAYMENT.CAPTURE.COMPLETED";
pub const BILLING_SUBSCRIPTION_CREATED: &str = "BILLING.SUBSCRIPTION.CREATED";
pub const BILLING_SUBSCRIPTION_CANCELLED: &str = "BILLING.SUBSCRIPTION.CANCELLED";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayPalEvent {
    pub id: String,
    pub event_type: String,
    pub create_time: String,
    pub resource_type: String,
    pub resource: Value,
    pub summary: Option<String>,
}

impl PayPalEvent {
    /// Reads a nested string, e.g. `["amount", "currency_code"]`.
    pub(crate) fn resource_str(&self, path: &[&str]) -> Option<&str> {
        path.iter().try_fold(&self.resource, |value, key| value.get(key)).and_then(Value::as_str)
    }
}

/// Converts a PayPal decimal amount (`"49.99"`) to minor units (`4999`).
///
/// Returns `None` for anything that is not a plain non-negative decimal
/// with at most two fraction digits.
#[must_use]
pub fn to_minor_units(value: &str) -> Option<i64> {
    let (whole, fraction) = value.trim().split_once('.').unwrap_or((value.trim(), ""));
    if whole.is_empty()
        || fraction.len() > 2
        || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let cents = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse::<i64>().ok()?,
    };
    whole.parse::<i64>().ok()?.checked_mul(100)?.checked_add(cents)
}
