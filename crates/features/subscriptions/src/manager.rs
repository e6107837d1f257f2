use chrono::{DateTime, Utc};
use qpay_kernel::domain::payments::{SubscriptionPlan, SubscriptionStatus, UserSubscription};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct SubscriptionManager {
    by_email: RwLock<HashMap<String, UserSubscription>>,
}

impl SubscriptionManager {
    /// Activates `plan_name` for `email`, replacing any previous subscription.
    ///
    /// Unknown plan names resolve to [`SubscriptionPlan::Free`].
    pub async fn activate(
        &self,
        email: &str,
        customer_id: Option<String>,
        subscription_id: Option<String>,
        plan_name: &str,
    ) -> UserSubscription {
        let subscription = UserSubscription {
            user_id: Uuid::new_v4(),
            email: email.to_owned(),
            stripe_customer_id: customer_id,
            stripe_subscription_id: subscription_id,
            plan: SubscriptionPlan::from_name(plan_name),
            status: SubscriptionStatus::Active,
            activated_at: Utc::now(),
            current_period_end: None,
        };

        self.by_email.write().await.insert(email.to_owned(), subscription.clone());
        info!(email, plan = plan_name, user_id = %subscription.user_id, "Subscription activated");

        subscription
    }

    pub async fn get_by_email(&self, email: &str) -> Option<UserSubscription> {
        self.by_email.read().await.get(email).cloned()
    }

    /// Finds the subscription carrying a provider subscription id.
    pub async fn find_by_subscription_id(&self, subscription_id: &str) -> Option<UserSubscription> {
        self.by_email
            .read()
            .await
            .values()
            .find(|sub| sub.stripe_subscription_id.as_deref() == Some(subscription_id))
            .cloned()
    }

    /// Returns `false` when no subscription exists for `email`.
    pub async fn cancel(&self, email: &str) -> bool {
        let changed = self.set_status(email, SubscriptionStatus::Canceled).await;
        if changed {
            info!(email, "Subscription canceled");
        }
        changed
    }

    pub async fn mark_past_due(&self, email: &str) -> bool {
        let changed = self.set_status(email, SubscriptionStatus::PastDue).await;
        if changed {
            info!(email, "Subscription past due");
        }
        changed
    }

    /// Marks a successful renewal: back to `Active`, period end moved forward when known.
    pub async fn record_payment(&self, email: &str, period_end: Option<DateTime<Utc>>) -> bool {
        let mut store = self.by_email.write().await;
        let Some(sub) = store.get_mut(email) else {
            debug!(email, "Payment for unknown subscription");
            return false;
        };

        sub.status = SubscriptionStatus::Active;
        if period_end.is_some() {
            sub.current_period_end = period_end;
        }
        true
    }

    pub async fn len(&self) -> usize {
        self.by_email.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.by_email.read().await.is_empty()
    }

    async fn set_status(&self, email: &str, status: SubscriptionStatus) -> bool {
        self.by_email.write().await.get_mut(email).map(|sub| sub.status = status).is_some()
    }
}
