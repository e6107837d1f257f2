use crate::PayPal;
use crate::error::PayPalError;
use crate::events::{
    BILLING_SUBSCRIPTION_CANCELLED, BILLING_SUBSCRIPTION_CREATED, PAYMENT_CAPTURE_COMPLETED,
    PayPalEvent, to_minor_units,
};
use qpay_cache::EventResult;
use qpay_domain::payments::{PaymentActivity, Provider};
use tracing::info;

/// Applies a PayPal event.
///
/// # Errors
/// [`PayPalError::Processing`] when a capture carries an unreadable amount.
pub fn process_event(paypal: &PayPal, event: &PayPalEvent) -> Result<EventResult, PayPalError> {
    let resource_id = event.resource_str(&["id"]).unwrap_or(&event.id);

    let activity = match event.event_type.as_str() {
        PAYMENT_CAPTURE_COMPLETED => {
            let amount = event
                .resource_str(&["amount", "value"])
                .map(|value| {
                    to_minor_units(value).ok_or_else(|| PayPalError::Processing {
                        message: format!("Invalid capture amount '{value}'").into(),
                        context: Some(event.id.clone().into()),
                    })
                })
                .transpose()?;
            let currency = event.resource_str(&["amount", "currency_code"]).map(str::to_owned);

            info!(event_id = %event.id, capture_id = resource_id, amount_cents = amount, currency = currency.as_deref(), "PayPal payment captured");
            PaymentActivity::new(Provider::PayPal, "payment.captured").amount(amount).currency(currency)
        },
        BILLING_SUBSCRIPTION_CREATED => {
            info!(event_id = %event.id, subscription_id = resource_id, "PayPal subscription created");
            PaymentActivity::new(Provider::PayPal, "subscription.created")
        },
        BILLING_SUBSCRIPTION_CANCELLED => {
            info!(event_id = %event.id, subscription_id = resource_id, "PayPal subscription cancelled");
            PaymentActivity::new(Provider::PayPal, "subscription.cancelled")
        },
        other => {
            info!(event_id = %event.id, event_type = other, "Unhandled PayPal event type");
            return Ok(EventResult::Ignored);
        },
    };

    let activity = match event.resource_str(&["subscriber", "email_address"]) {
        Some(email) => activity.email(email),
        None => activity,
    };
    paypal.publish(activity.reference(resource_id));

    Ok(EventResult::Handled)
}
