//! Audit feature slice.
//!
//! Every payment slice publishes [`PaymentActivity`] on the event bus. This slice
//! listens and appends each one to a SHA-256 hash chain, so any later edit of a
//! stored record is detectable with [`verify_chain`].

mod error;
mod trail;

pub use crate::error::AuditError;
pub use crate::trail::{AuditRecord, AuditTrail, GENESIS_DIGEST, verify_chain};

use qpay_domain::config::AuditConfig;
use qpay_domain::payments::PaymentActivity;
use qpay_event_bus::{EventBus, EventReceiverExt};
use qpay_kernel::domain::registry::InitializedSlice;
use tokio::task::JoinHandle;
use tracing::{error, info};

qpay_kernel::feature_slice!(
    /// Shared handle to the audit trail.
    pub struct Audit => AuditTrail
);

impl Audit {
    /// Records every [`PaymentActivity`] published on `bus` until the bus shuts down.
    ///
    /// The subscription is taken before this returns, so nothing published
    /// afterwards is missed.
    ///
    /// # Errors
    /// Fails when the bus refuses the subscription.
    pub fn spawn_listener(&self, bus: &EventBus) -> Result<JoinHandle<()>, AuditError> {
        let mut rx = bus
            .subscribe::<PaymentActivity>()
            .map_err(|source| AuditError::Bus { source, context: None })?;
        let audit = self.clone();

        Ok(tokio::spawn(async move {
            while let Some(activity) = rx.next_event().await {
                match audit.record(&activity).await {
                    Ok(record) => info!(
                        sequence = record.sequence,
                        event = %record.event,
                        provider = %record.provider,
                        email = record.email.as_deref().unwrap_or("-"),
                        amount_cents = record.amount_cents,
                        digest = %record.digest,
                        "Audit"
                    ),
                    Err(e) => error!(error = %e, kind = %activity.kind, "Failed to record payment activity"),
                }
            }
            info!("Audit listener stopped");
        }))
    }
}

/// Initialize the audit feature and start listening on `bus`.
///
/// The returned handle finishes once the bus is shut down and every activity
/// already queued has been recorded; await it before exiting.
///
/// # Errors
/// Fails when the configured audit file is unusable or its chain is broken.
pub async fn init(
    config: &AuditConfig,
    bus: &EventBus,
) -> Result<(Audit, InitializedSlice, JoinHandle<()>), AuditError> {
    let audit = Audit::new(AuditTrail::open(config).await?);
    let listener = audit.spawn_listener(bus)?;

    info!(persistent = config.path.is_some(), "Audit slice initialized");
    Ok((audit.clone(), InitializedSlice::new(audit), listener))
}
