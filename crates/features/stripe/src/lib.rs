//! Stripe feature slice.
//!
//! * `POST /stripe/webhook`: verified, idempotent processing of subscription events.
//! * `POST /stripe/portal`: billing portal sessions for existing customers.
//!
//! Every processed payment is published as [`PaymentActivity`] on the event bus.

mod error;
pub mod events;
mod handler;
mod routes;
pub mod signature;

pub use crate::error::StripeError;
pub use crate::handler::process_event;
pub use crate::routes::{PortalRequest, PortalSessionResponse, router};

use qpay_domain::config::StripeConfig;
use qpay_domain::payments::PaymentActivity;
use qpay_event_bus::EventBus;
use qpay_kernel::domain::registry::InitializedSlice;
use qpay_subscriptions::Subscriptions;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const PORTAL_SESSIONS_PATH: &str = "/v1/billing_portal/sessions";

/// Stripe feature inner state.
#[derive(Debug)]
pub struct StripeInner {
    pub config: StripeConfig,
    pub subscriptions: Subscriptions,
    pub events: EventBus,
    http: reqwest::Client,
}

qpay_kernel::feature_slice!(pub struct Stripe => StripeInner);

#[derive(Deserialize)]
struct PortalSession {
    url: String,
}

impl Stripe {
    /// Publishes audit-worthy activity. A bus failure never fails the webhook.
    pub(crate) fn publish(&self, activity: PaymentActivity) {
        if let Err(e) = self.events.publish(activity) {
            warn!(error = %e, "Failed to publish Stripe payment activity");
        }
    }

    /// Calls `POST /v1/billing_portal/sessions` and returns the session URL.
    ///
    /// # Errors
    /// [`StripeError::Config`] without a secret key, [`StripeError::Upstream`] when
    /// the call fails or Stripe rejects it.
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: Option<&str>,
    ) -> Result<String, StripeError> {
        if self.config.secret_key.is_empty() {
            return Err(StripeError::Config { message: "secret_key is empty".into(), context: None });
        }

        let mut form = vec![("customer", customer_id)];
        if let Some(url) = return_url {
            form.push(("return_url", url));
        }

        let endpoint = format!("{}{PORTAL_SESSIONS_PATH}", self.config.api_base.trim_end_matches('/'));
        let response =
            self.http.post(&endpoint).bearer_auth(&self.config.secret_key).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StripeError::Upstream {
                message: format!("{status}: {body}").into(),
                context: Some(PORTAL_SESSIONS_PATH.into()),
            });
        }

        Ok(response.json::<PortalSession>().await?.url)
    }
}

/// Initialize the Stripe feature.
///
/// # Errors
/// Fails when the HTTP client cannot be built.
pub fn init(
    config: &StripeConfig,
    subscriptions: Subscriptions,
    events: EventBus,
) -> Result<InitializedSlice, StripeError> {
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| StripeError::Config {
            message: e.to_string().into(),
            context: Some("Failed to build HTTP client".into()),
        })?;

    info!(api_base = %config.api_base, "Stripe slice initialized");

    let inner = StripeInner { config: config.clone(), subscriptions, events, http };
    Ok(InitializedSlice::new(Stripe::new(inner)))
}
