use qpay::features;
use qpay_cache::IdempotencyStore;
use qpay_domain::config::{ApiConfig, AuditConfig};
use qpay_domain::payments::{PaymentActivity, Provider};
use qpay_event_bus::EventBus;
use qpay_kernel::server::ApiState;
use std::time::Duration;

#[tokio::test]
async fn init_registers_every_enabled_slice() {
    let config = ApiConfig::default();
    let events = EventBus::new();

    let platform = qpay::init(&config, &events).await.unwrap();
    assert_eq!(platform.slices.len(), features::ENABLED.len());
    assert_eq!(platform.tasks.len(), 1);

    let state = ApiState::builder()
        .config(config)
        .events(events)
        .idempotency(IdempotencyStore::builder().build().await)
        .register_slices(platform.slices)
        .build()
        .unwrap();

    assert!(state.get_slice::<features::audit::Audit>().is_some());
    assert!(state.get_slice::<features::subscriptions::Subscriptions>().is_some());
    #[cfg(feature = "stripe")]
    assert!(state.get_slice::<features::stripe::Stripe>().is_some());
    #[cfg(feature = "paypal")]
    assert!(state.get_slice::<features::paypal::PayPal>().is_some());
}

#[test]
fn providers_are_enabled_by_default() {
    assert!(features::is_enabled("audit"));
    assert_eq!(features::is_enabled("stripe"), cfg!(feature = "stripe"));
    assert!(!features::is_enabled("licensing"));
}

#[tokio::test]
async fn shutdown_drains_queued_activity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trail.jsonl");
    let mut config = ApiConfig::default();
    config.audit = AuditConfig { path: Some(path.clone()), capacity: 8 };
    let events = EventBus::new();

    let platform = qpay::init(&config, &events).await.unwrap();
    for _ in 0..20 {
        events.publish(PaymentActivity::new(Provider::PayPal, "payment.captured")).unwrap();
    }
    events.shutdown();

    assert_eq!(platform.tasks.join(Duration::from_secs(5)).await, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 20);
}
