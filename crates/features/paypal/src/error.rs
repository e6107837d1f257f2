use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use qpay_kernel::server::ApiStateError;
use std::borrow::Cow;
use tracing::{error, warn};

/// A specialized [`PayPalError`] enum of this crate.
#[derive(Debug, thiserror::Error)]
pub enum PayPalError {
    /// The body is not a PayPal event.
    #[error("Invalid PayPal event{}: {source}", format_context(.context))]
    InvalidEvent {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },
    /// Verification is on and a `PAYPAL-*` transmission header is absent.
    #[error("Missing transmission header: {header}")]
    MissingHeader { header: &'static str },
    /// PayPal did not confirm the delivery.
    #[error("PayPal signature rejected{}: {message}", format_context(.context))]
    InvalidSignature { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    /// The OAuth token could not be obtained.
    #[error("PayPal auth error{}: {message}", format_context(.context))]
    Auth { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    /// A PayPal API call failed.
    #[error("PayPal API error{}: {message}", format_context(.context))]
    Upstream { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    /// A verified event could not be applied.
    #[error("{message}")]
    Processing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[error("PayPal config error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[error(transparent)]
    State(#[from] ApiStateError),
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

impl PayPalError {
    pub(crate) fn upstream(e: &reqwest::Error, context: &'static str) -> Self {
        Self::Upstream { message: e.to_string().into(), context: Some(context.into()) }
    }
}

impl IntoResponse for PayPalError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidEvent { source, .. } => {
                warn!(error = %source, "Failed to parse PayPal event");
                (StatusCode::BAD_REQUEST, "Invalid event").into_response()
            },
            Self::MissingHeader { header } => {
                warn!(header, "PayPal webhook without transmission header");
                (StatusCode::BAD_REQUEST, "Missing transmission headers").into_response()
            },
            e @ Self::InvalidSignature { .. } => {
                warn!(error = %e, "PayPal webhook verification failed");
                (StatusCode::UNAUTHORIZED, "Invalid signature").into_response()
            },
            e @ (Self::Auth { .. } | Self::Upstream { .. }) => {
                error!(error = %e, "PayPal API call failed");
                (StatusCode::BAD_GATEWAY, "PayPal API unavailable").into_response()
            },
            Self::Processing { message, context } => {
                error!(error = %message, context = context.as_deref(), "PayPal event processing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message.into_owned()).into_response()
            },
            e @ Self::Config { .. } => {
                error!(error = %e, "PayPal is not configured");
                (StatusCode::SERVICE_UNAVAILABLE, "PayPal is not configured").into_response()
            },
            Self::State(e) => e.into_response(),
        }
    }
}
