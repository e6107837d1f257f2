use crate::Stripe;
use crate::error::StripeError;
use crate::events::{
    CHECKOUT_SESSION_COMPLETED, CheckoutSession, INVOICE_PAID, INVOICE_PAYMENT_FAILED,
    SUBSCRIPTION_DELETED, StripeEvent,
};
use chrono::{DateTime, Utc};
use qpay_cache::EventResult;
use qpay_domain::payments::{PaymentActivity, Provider};
use tracing::{info, warn};

const UNKNOWN_EMAIL: &str = "unknown";

/// Applies a verified Stripe event.
///
/// # Errors
/// [`StripeError::Processing`] when the event payload lacks what its type requires.
pub async fn process_event(stripe: &Stripe, event: &StripeEvent) -> Result<EventResult, StripeError> {
    match event.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => checkout_completed(stripe, event).await,
        INVOICE_PAID => invoice_paid(stripe, event).await,
        INVOICE_PAYMENT_FAILED => payment_failed(stripe, event).await,
        SUBSCRIPTION_DELETED => subscription_deleted(stripe, event).await,
        other => {
            info!(event_id = %event.id, event_type = other, "Unhandled Stripe event type");
            Ok(EventResult::Ignored)
        },
    }
}

async fn checkout_completed(stripe: &Stripe, event: &StripeEvent) -> Result<EventResult, StripeError> {
    let session: CheckoutSession = serde_json::from_value(event.data.object.clone())
        .map_err(|e| StripeError::processing(format!("Failed to parse session: {e}")))?;

    let email = session.email().ok_or_else(|| {
        StripeError::processing(format!("Checkout session {} has no customer email", session.id))
    })?;
    let plan = session.plan().unwrap_or(&stripe.config.default_plan);

    info!(event_id = %event.id, session_id = %session.id, email, plan, "Checkout completed");

    let subscription = stripe
        .subscriptions
        .activate(email, session.customer.clone(), session.subscription.clone(), plan)
        .await;

    stripe.publish(
        PaymentActivity::new(Provider::Stripe, "checkout.completed")
            .email(email)
            .amount(session.amount_total)
            .currency(session.currency.clone())
            .reference(&session.id),
    );

    Ok(EventResult::Success { user_id: subscription.user_id, plan: plan.to_owned() })
}

async fn invoice_paid(stripe: &Stripe, event: &StripeEvent) -> Result<EventResult, StripeError> {
    let email = event.object_str("customer_email").unwrap_or(UNKNOWN_EMAIL);
    let amount = event.object_i64("amount_paid").unwrap_or(0);
    let period_end =
        event.object_i64("period_end").and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    let renewed = stripe.subscriptions.record_payment(email, period_end).await;
    info!(event_id = %event.id, email, amount_cents = amount, renewed, "Invoice paid");

    stripe.publish(
        PaymentActivity::new(Provider::Stripe, "invoice.paid")
            .email(email)
            .amount(Some(amount))
            .currency(event.object_str("currency").map(str::to_owned))
            .reference(&event.id),
    );

    Ok(EventResult::Handled)
}

async fn payment_failed(stripe: &Stripe, event: &StripeEvent) -> Result<EventResult, StripeError> {
    let email = event.object_str("customer_email").unwrap_or(UNKNOWN_EMAIL);

    let past_due = stripe.subscriptions.mark_past_due(email).await;
    warn!(event_id = %event.id, email, past_due, "Invoice payment failed");

    stripe.publish(
        PaymentActivity::new(Provider::Stripe, "payment.failed")
            .email(email)
            .amount(event.object_i64("amount_due"))
            .currency(event.object_str("currency").map(str::to_owned))
            .reference(&event.id),
    );

    Ok(EventResult::Handled)
}

async fn subscription_deleted(stripe: &Stripe, event: &StripeEvent) -> Result<EventResult, StripeError> {
    let email = match event.object_str("customer_email") {
        Some(email) => Some(email.to_owned()),
        None => match event.object_str("id") {
            Some(id) => stripe.subscriptions.find_by_subscription_id(id).await.map(|sub| sub.email),
            None => None,
        },
    };

    let Some(email) = email else {
        info!(event_id = %event.id, "Deleted subscription is not tracked");
        return Ok(EventResult::Ignored);
    };

    let canceled = stripe.subscriptions.cancel(&email).await;
    info!(event_id = %event.id, email = %email, canceled, "Subscription deleted");

    stripe.publish(
        PaymentActivity::new(Provider::Stripe, "subscription.deleted")
            .email(email)
            .reference(&event.id),
    );

    Ok(EventResult::Handled)
}
