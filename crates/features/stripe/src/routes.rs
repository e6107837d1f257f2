use crate::Stripe;
use crate::error::StripeError;
use crate::events::StripeEvent;
use crate::handler::process_event;
use crate::signature::verify_webhook_signature;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;
use qpay_cache::EventResult;
use qpay_domain::constants::{STRIPE_SIGNATURE_HEADER, STRIPE_TAG};
use qpay_domain::payments::Provider;
use qpay_kernel::server::ApiState;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new().routes(routes!(webhook_handler)).routes(routes!(portal_handler))
}

/// Receive a signed Stripe event
///
/// The raw body is verified against the `Stripe-Signature` header before it is parsed.
/// Every event id is processed once; redeliveries are acknowledged without side effects.
#[utoipa::path(
    post,
    path = "/stripe/webhook",
    request_body(content = String, description = "Stripe event JSON, byte for byte as signed", content_type = "application/json"),
    params(("stripe-signature" = String, Header, description = "t=<unix>,v1=<hex HMAC-SHA256>")),
    responses(
        (status = OK, description = "Processed, ignored, or already processed", body = String),
        (status = BAD_REQUEST, description = "Missing signature or unparsable event"),
        (status = UNAUTHORIZED, description = "Signature verification failed"),
        (status = INTERNAL_SERVER_ERROR, description = "Processing failed; Stripe will retry"),
    ),
    tag = STRIPE_TAG,
)]
pub(crate) async fn webhook_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, StripeError> {
    let stripe = state.try_get_slice::<Stripe>()?;

    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(StripeError::MissingSignature)?;

    verify_webhook_signature(
        &body,
        signature,
        &stripe.config.webhook_secret,
        stripe.config.tolerance_seconds,
        Utc::now().timestamp(),
    )
    .map_err(|source| StripeError::InvalidSignature { source })?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|source| StripeError::InvalidEvent { source, context: None })?;

    info!(event_id = %event.id, event_type = %event.event_type, livemode = event.livemode, "Stripe event received");

    // Claim first so concurrent redeliveries cannot both run side effects.
    if !state.idempotency.claim(Provider::Stripe, &event.id).await {
        info!(event_id = %event.id, "Stripe event is already being processed");
        return Ok((StatusCode::OK, "Already processed"));
    }
    if state.idempotency.is_processed(Provider::Stripe, &event.id).await {
        state.idempotency.release(Provider::Stripe, &event.id).await;
        info!(event_id = %event.id, "Stripe event already processed");
        return Ok((StatusCode::OK, "Already processed"));
    }

    let outcome = process_event(stripe, &event).await;
    let record = match &outcome {
        Ok(result) => result.clone(),
        Err(e) => EventResult::Failed { error: e.to_string() },
    };
    state.idempotency.mark_processed(Provider::Stripe, &event.id, record).await;
    state.idempotency.release(Provider::Stripe, &event.id).await;

    outcome.map(|_| (StatusCode::OK, "Success"))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PortalRequest {
    /// Stripe customer id (`cus_...`).
    pub customer_id: Option<String>,
    /// Where the portal sends the customer back to.
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PortalSessionResponse {
    pub url: String,
}

/// Create a customer billing portal session
#[utoipa::path(
    post,
    path = "/stripe/portal",
    request_body = PortalRequest,
    responses(
        (status = OK, description = "Portal session created", body = PortalSessionResponse),
        (status = BAD_REQUEST, description = "Missing customer id"),
        (status = BAD_GATEWAY, description = "Stripe API call failed"),
        (status = SERVICE_UNAVAILABLE, description = "Stripe secret key not configured"),
    ),
    tag = STRIPE_TAG,
)]
pub(crate) async fn portal_handler(
    State(state): State<ApiState>,
    Json(request): Json<PortalRequest>,
) -> Result<Json<PortalSessionResponse>, StripeError> {
    let stripe = state.try_get_slice::<Stripe>()?;

    let customer_id = request
        .customer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StripeError::BadRequest { message: "Missing customer_id".into(), context: None })?;

    let url = stripe.create_portal_session(customer_id, request.return_url.as_deref()).await?;
    info!(customer_id, "Billing portal session created");

    Ok(Json(PortalSessionResponse { url }))
}
