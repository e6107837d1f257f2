//! Subscriptions feature slice.
//!
//! Keeps the current subscription of every paying customer, keyed by email.
//! Records live in memory and are rebuilt from provider webhooks after a restart.

mod manager;

pub use crate::manager::SubscriptionManager;
use qpay_kernel::domain::registry::InitializedSlice;

qpay_kernel::feature_slice!(
    /// Shared handle to the subscription registry.
    pub struct Subscriptions => SubscriptionManager
);

impl Default for Subscriptions {
    fn default() -> Self {
        Self::new(SubscriptionManager::default())
    }
}

/// Initialize the subscriptions feature.
///
/// The returned handle is shared with the provider slices that update it.
#[must_use]
pub fn init() -> (Subscriptions, InitializedSlice) {
    tracing::info!("Subscriptions slice initialized");

    let slice = Subscriptions::default();
    (slice.clone(), InitializedSlice::new(slice))
}
