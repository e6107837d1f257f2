//! Shared names: OpenAPI tags, provider header names, cache key prefixes.

pub const SYSTEM_TAG: &str = "System";
pub const STRIPE_TAG: &str = "Stripe";
pub const PAYPAL_TAG: &str = "PayPal";

/// Header carrying `t=<unix>,v1=<hex>` on Stripe webhook deliveries.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub const PAYPAL_AUTH_ALGO_HEADER: &str = "paypal-auth-algo";
pub const PAYPAL_CERT_URL_HEADER: &str = "paypal-cert-url";
pub const PAYPAL_TRANSMISSION_ID_HEADER: &str = "paypal-transmission-id";
pub const PAYPAL_TRANSMISSION_SIG_HEADER: &str = "paypal-transmission-sig";
pub const PAYPAL_TRANSMISSION_TIME_HEADER: &str = "paypal-transmission-time";

/// Prefix of every idempotency key, followed by `<provider>:<event id>`.
pub const EVENT_KEY_PREFIX: &str = "event";

/// Prefix of the short-lived key held while a delivery is being processed.
pub const CLAIM_KEY_PREFIX: &str = "claim";
