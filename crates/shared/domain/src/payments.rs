//! Payment vocabulary shared across slices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Stripe,
    PayPal,
}

impl Provider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::PayPal => "paypal",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionPlan {
    Free,
    Pro { monthly: bool },
    Enterprise { monthly: bool },
}

impl SubscriptionPlan {
    /// Maps a checkout plan name to a plan. Unknown names fall back to [`SubscriptionPlan::Free`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "pro_monthly" => Self::Pro { monthly: true },
            "pro_annual" => Self::Pro { monthly: false },
            "enterprise_monthly" => Self::Enterprise { monthly: true },
            "enterprise_annual" => Self::Enterprise { monthly: false },
            _ => Self::Free,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro { monthly: true } => "pro_monthly",
            Self::Pro { monthly: false } => "pro_annual",
            Self::Enterprise { monthly: true } => "enterprise_monthly",
            Self::Enterprise { monthly: false } => "enterprise_annual",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSubscription {
    pub user_id: Uuid,
    pub email: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub activated_at: DateTime<Utc>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Something worth an audit record. Slices publish it on the event bus.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentActivity {
    pub provider: Provider,
    /// Short event name, e.g. `checkout.completed`.
    pub kind: String,
    pub email: Option<String>,
    /// Amount in minor units (cents).
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    /// Provider-side identifier (event or object id).
    pub reference: Option<String>,
}

impl PaymentActivity {
    #[must_use]
    pub fn new(provider: Provider, kind: impl Into<String>) -> Self {
        Self {
            provider,
            kind: kind.into(),
            email: None,
            amount_cents: None,
            currency: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub const fn amount(mut self, amount_cents: Option<i64>) -> Self {
        self.amount_cents = amount_cents;
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Option<String>) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}
