//! Facade crate for the payment backend.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Providers are Cargo features (`stripe`, `paypal`), both on by default.
//! - Call [`init`] to build every enabled slice, then [`server::router::api_router`]
//!   for their routes.

pub use qpay_domain as domain;
pub use qpay_kernel as kernel;

use qpay_domain::config::ApiConfig;
use qpay_domain::registry::InitializedSlice;
use qpay_event_bus::EventBus;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

pub mod server {
    pub mod router {
        pub use qpay_kernel::server::router::system_router;
        use qpay_kernel::server::ApiState;
        use utoipa_axum::router::OpenApiRouter;

        /// System routes plus the routes of every enabled provider.
        #[must_use]
        pub fn api_router() -> OpenApiRouter<ApiState> {
            let router = system_router();
            #[cfg(feature = "stripe")]
            let router = router.merge(qpay_stripe::router());
            #[cfg(feature = "paypal")]
            let router = router.merge(qpay_paypal::router());
            router
        }
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use qpay_audit as audit;
    #[cfg(feature = "paypal")]
    pub use qpay_paypal as paypal;
    #[cfg(feature = "stripe")]
    pub use qpay_stripe as stripe;
    pub use qpay_subscriptions as subscriptions;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        "audit",
        "subscriptions",
        #[cfg(feature = "stripe")]
        "stripe",
        #[cfg(feature = "paypal")]
        "paypal",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Everything [`init`] produced: the slices to register and the tasks to drain
/// on shutdown.
#[derive(Debug, Default)]
pub struct Platform {
    pub slices: Vec<InitializedSlice>,
    pub tasks: BackgroundTasks,
}

/// Background tasks that end once the event bus is shut down.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits up to `grace` for every task to finish.
    ///
    /// Returns how many tasks did not finish cleanly. Call it after the event bus
    /// has been shut down, otherwise listeners never end.
    pub async fn join(self, grace: Duration) -> usize {
        let deadline = Instant::now() + grace;
        let mut unfinished = 0;

        for handle in self.handles {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    warn!(error = %e, "Background task failed");
                    unfinished += 1;
                },
                Err(_) => {
                    warn!(?grace, "Background task still running after the grace period");
                    unfinished += 1;
                },
            }
        }
        unfinished
    }
}

/// Initialize all enabled features.
///
/// The audit listener is subscribed to `events` before any provider slice exists,
/// so no payment activity is lost.
///
/// # Errors
/// Returns an error if any feature initialization fails.
pub async fn init(
    config: &ApiConfig,
    events: &EventBus,
) -> Result<Platform, Box<dyn std::error::Error + Send + Sync>> {
    let mut platform = Platform::default();

    // Audit
    let (_audit, slice, listener) = features::audit::init(&config.audit, events).await?;
    platform.slices.push(slice);
    platform.tasks.push(listener);

    // Subscriptions, shared with the providers that update them
    #[cfg_attr(not(feature = "stripe"), allow(unused_variables))]
    let (subscriptions, slice) = features::subscriptions::init();
    platform.slices.push(slice);

    #[cfg(feature = "stripe")]
    platform.slices.push(features::stripe::init(&config.stripe, subscriptions, events.clone())?);

    #[cfg(feature = "paypal")]
    platform.slices.push(features::paypal::init(&config.paypal, events.clone())?);

    Ok(platform)
}
