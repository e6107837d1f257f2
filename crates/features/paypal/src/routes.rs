use crate::PayPal;
use crate::error::PayPalError;
use crate::events::PayPalEvent;
use crate::handler::process_event;
use crate::verify::{TransmissionHeaders, verify_webhook};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use qpay_cache::EventResult;
use qpay_domain::constants::PAYPAL_TAG;
use qpay_domain::payments::Provider;
use qpay_kernel::server::ApiState;
use serde_json::value::RawValue;
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new().routes(routes!(webhook_handler))
}

/// Receive a PayPal webhook event
///
/// With `paypal.verify_signatures` on, the delivery is confirmed with PayPal
/// before anything is processed.
#[utoipa::path(
    post,
    path = "/paypal/webhook",
    request_body(content = String, description = "PayPal event JSON", content_type = "application/json"),
    responses(
        (status = OK, description = "Received or already processed", body = String),
        (status = BAD_REQUEST, description = "Unparsable event or missing transmission headers"),
        (status = UNAUTHORIZED, description = "PayPal did not confirm the delivery"),
        (status = BAD_GATEWAY, description = "PayPal verification API unavailable"),
    ),
    tag = PAYPAL_TAG,
)]
pub(crate) async fn webhook_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, PayPalError> {
    let paypal = state.try_get_slice::<PayPal>()?;

    // Verification gets the event exactly as delivered.
    let raw: &RawValue = serde_json::from_slice(&body)
        .map_err(|source| PayPalError::InvalidEvent { source, context: None })?;
    let event: PayPalEvent = serde_json::from_str(raw.get())
        .map_err(|source| PayPalError::InvalidEvent { source, context: None })?;

    info!(event_id = %event.id, event_type = %event.event_type, "PayPal event received");

    if paypal.config.verify_signatures {
        let transmission = TransmissionHeaders::from_headers(&headers)?;
        verify_webhook(paypal, &transmission, raw).await?;
    }

    // Claim first so concurrent redeliveries cannot both run side effects.
    if !state.idempotency.claim(Provider::PayPal, &event.id).await {
        info!(event_id = %event.id, "PayPal event is already being processed");
        return Ok((StatusCode::OK, "Already processed"));
    }
    if state.idempotency.is_processed(Provider::PayPal, &event.id).await {
        state.idempotency.release(Provider::PayPal, &event.id).await;
        info!(event_id = %event.id, "PayPal event already processed");
        return Ok((StatusCode::OK, "Already processed"));
    }

    let outcome = process_event(paypal, &event);
    let record = match &outcome {
        Ok(result) => result.clone(),
        Err(e) => EventResult::Failed { error: e.to_string() },
    };
    state.idempotency.mark_processed(Provider::PayPal, &event.id, record).await;
    state.idempotency.release(Provider::PayPal, &event.id).await;

    outcome.map(|_| (StatusCode::OK, "Received"))
}
