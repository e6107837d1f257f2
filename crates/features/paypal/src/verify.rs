//! Delivery verification through PayPal's `verify-webhook-signature` API.

use crate::PayPal;
use crate::error::PayPalError;
use axum::http::HeaderMap;
use qpay_domain::constants::{
    PAYPAL_AUTH_ALGO_HEADER, PAYPAL_CERT_URL_HEADER, PAYPAL_TRANSMISSION_ID_HEADER,
    PAYPAL_TRANSMISSION_SIG_HEADER, PAYPAL_TRANSMISSION_TIME_HEADER,
};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::debug;

const VERIFY_PATH: &str = "/v1/notifications/verify-webhook-signature";
const VERIFIED: &str = "SUCCESS";

/// The transmission headers PayPal attaches to every delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionHeaders {
    pub auth_algo: String,
    pub cert_url: String,
    pub transmission_id: String,
    pub transmission_sig: String,
    pub transmission_time: String,
}

impl TransmissionHeaders {
    /// # Errors
    /// [`PayPalError::MissingHeader`] naming the first absent header.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, PayPalError> {
        let get = |name: &'static str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .ok_or(PayPalError::MissingHeader { header: name })
        };

        Ok(Self {
            auth_algo: get(PAYPAL_AUTH_ALGO_HEADER)?,
            cert_url: get(PAYPAL_CERT_URL_HEADER)?,
            transmission_id: get(PAYPAL_TRANSMISSION_ID_HEADER)?,
            transmission_sig: get(PAYPAL_TRANSMISSION_SIG_HEADER)?,
            transmission_time: get(PAYPAL_TRANSMISSION_TIME_HEADER)?,
        })
    }
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    auth_algo: &'a str,
    cert_url: &'a str,
    transmission_id: &'a str,
    transmission_sig: &'a str,
    transmission_time: &'a str,
    webhook_id: &'a str,
    webhook_event: &'a RawValue,
}

#[derive(Deserialize)]
struct VerifyResponse {
    verification_status: String,
}

/// Asks PayPal whether `event` was sent by PayPal for the configured webhook.
///
/// # Errors
/// * [`PayPalError::Config`] when no webhook id is configured.
/// * [`PayPalError::Auth`] / [`PayPalError::Upstream`] when PayPal cannot be reached.
/// * [`PayPalError::InvalidSignature`] for any status other than `SUCCESS`.
pub async fn verify_webhook(
    paypal: &PayPal,
    headers: &TransmissionHeaders,
    event: &RawValue,
) -> Result<(), PayPalError> {
    if paypal.config.webhook_id.is_empty() {
        return Err(PayPalError::Config { message: "webhook_id is empty".into(), context: None });
    }

    let token = paypal.tokens.access_token().await?;
    let request = VerifyRequest {
        auth_algo: &headers.auth_algo,
        cert_url: &headers.cert_url,
        transmission_id: &headers.transmission_id,
        transmission_sig: &headers.transmission_sig,
        transmission_time: &headers.transmission_time,
        webhook_id: &paypal.config.webhook_id,
        webhook_event: event,
    };

    let url = format!("{}{VERIFY_PATH}", paypal.config.base_url().trim_end_matches('/'));
    let response = paypal
        .http
        .post(&url)
        .bearer_auth(&token)
        .json(&request)
        .send()
        .await
        .map_err(|e| PayPalError::upstream(&e, VERIFY_PATH))?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        paypal.tokens.invalidate().await;
    }
    if !status.is_success() {
        return Err(PayPalError::Upstream {
            message: format!("verification request failed with {status}").into(),
            context: Some(VERIFY_PATH.into()),
        });
    }

    let body: VerifyResponse =
        response.json().await.map_err(|e| PayPalError::upstream(&e, VERIFY_PATH))?;
    debug!(transmission_id = %headers.transmission_id, status = %body.verification_status, "PayPal verification");

    if body.verification_status == VERIFIED {
        Ok(())
    } else {
        Err(PayPalError::InvalidSignature {
            message: body.verification_status.into(),
            context: Some(headers.transmission_id.clone().into()),
        })
    }
}
