use crate::signature::SignatureError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use qpay_kernel::server::ApiStateError;
use std::borrow::Cow;
use tracing::{error, warn};

/// A specialized [`StripeError`] enum of this crate.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// The `Stripe-Signature` header is absent or not ASCII.
    #[error("Missing Stripe signature header")]
    MissingSignature,
    /// The header does not prove the body came from Stripe.
    #[error("Invalid Stripe signature: {source}")]
    InvalidSignature {
        #[source]
        source: SignatureError,
    },
    /// The body is not a Stripe event.
    #[error("Invalid Stripe event{}: {source}", format_context(.context))]
    InvalidEvent {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },
    /// The caller sent an unusable request.
    #[error("Bad request{}: {message}", format_context(.context))]
    BadRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    /// A verified event could not be applied.
    #[error("{message}")]
    Processing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    /// The Stripe API failed or answered with an error.
    #[error("Stripe API error{}: {message}", format_context(.context))]
    Upstream { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    /// A required setting (such as the secret key) is missing.
    #[error("Stripe config error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[error(transparent)]
    State(#[from] ApiStateError),
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

impl StripeError {
    pub(crate) fn processing(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Processing { message: message.into(), context: None }
    }
}

impl From<reqwest::Error> for StripeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream { message: e.to_string().into(), context: e.url().map(|u| u.path().to_owned().into()) }
    }
}

impl IntoResponse for StripeError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingSignature => {
                warn!("Stripe webhook without signature header");
                (StatusCode::BAD_REQUEST, "Missing signature").into_response()
            },
            Self::InvalidSignature { source } => {
                warn!(reason = %source, "Stripe signature verification failed");
                (StatusCode::UNAUTHORIZED, "Invalid signature").into_response()
            },
            Self::InvalidEvent { source, .. } => {
                warn!(error = %source, "Failed to parse Stripe event");
                (StatusCode::BAD_REQUEST, "Invalid event").into_response()
            },
            Self::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, message.into_owned()).into_response()
            },
            Self::Processing { message, context } => {
                error!(error = %message, context = context.as_deref(), "Stripe event processing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message.into_owned()).into_response()
            },
            e @ Self::Upstream { .. } => {
                error!(error = %e, "Stripe API call failed");
                (StatusCode::BAD_GATEWAY, "Stripe API unavailable").into_response()
            },
            e @ Self::Config { .. } => {
                error!(error = %e, "Stripe is not configured");
                (StatusCode::SERVICE_UNAVAILABLE, "Stripe is not configured").into_response()
            },
            Self::State(e) => e.into_response(),
        }
    }
}
