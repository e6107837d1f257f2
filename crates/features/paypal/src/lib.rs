//! PayPal feature slice: `POST /paypal/webhook`.
//!
//! Deliveries are optionally verified with PayPal's verification API using a
//! cached OAuth token, deduplicated by event id, and published on the event
//! bus as [`PaymentActivity`].

mod error;
pub mod events;
mod handler;
mod routes;
mod token;
pub mod verify;

pub use crate::error::PayPalError;
pub use crate::handler::process_event;
pub use crate::routes::router;
pub use crate::token::TokenCache;

use qpay_domain::config::PayPalConfig;
use qpay_domain::payments::PaymentActivity;
use qpay_event_bus::EventBus;
use qpay_kernel::domain::registry::InitializedSlice;
use std::time::Duration;
use tracing::{info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// PayPal feature inner state.
#[derive(Debug)]
pub struct PayPalInner {
    pub config: PayPalConfig,
    pub events: EventBus,
    pub tokens: TokenCache,
    http: reqwest::Client,
}

qpay_kernel::feature_slice!(pub struct PayPal => PayPalInner);

impl PayPal {
    pub(crate) fn publish(&self, activity: PaymentActivity) {
        if let Err(e) = self.events.publish(activity) {
            warn!(error = %e, "Failed to publish PayPal payment activity");
        }
    }
}

/// Initialize the PayPal feature.
///
/// # Errors
/// Fails when the HTTP client cannot be built.
pub fn init(config: &PayPalConfig, events: EventBus) -> Result<InitializedSlice, PayPalError> {
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| PayPalError::Config {
            message: e.to_string().into(),
            context: Some("Failed to build HTTP client".into()),
        })?;

    if config.verify_signatures && config.webhook_id.is_empty() {
        warn!("PayPal signature verification is on but PAYPAL_WEBHOOK_ID is empty");
    }
    if !config.verify_signatures {
        warn!("PayPal webhook deliveries are not verified");
    }

    let tokens =
        TokenCache::new(http.clone(), config.base_url(), &config.client_id, &config.client_secret);
    info!(mode = ?config.mode, api_base = config.base_url(), "PayPal slice initialized");

    let inner = PayPalInner { config: config.clone(), events, tokens, http };
    Ok(InitializedSlice::new(PayPal::new(inner)))
}
