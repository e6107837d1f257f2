use qpay_audit::{Audit, AuditError, AuditTrail, init, verify_chain};
use qpay_domain::config::AuditConfig;
use qpay_domain::payments::{PaymentActivity, Provider};
use qpay_event_bus::EventBus;
use std::time::Duration;

async fn wait_for(audit: &Audit, count: u64) {
    for _ in 0..100 {
        if audit.len().await >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("audit trail did not reach {count} records");
}

#[tokio::test]
async fn published_activity_is_recorded() {
    let bus = EventBus::new();
    let (audit, slice, _listener) = init(&AuditConfig::default(), &bus).await.unwrap();
    assert_eq!(slice.id, std::any::TypeId::of::<Audit>());

    let delivered = bus
        .publish(
            PaymentActivity::new(Provider::PayPal, "payment.captured")
                .amount(Some(4_999))
                .currency(Some("EUR".to_owned()))
                .reference("WH-1"),
        )
        .unwrap();
    assert_eq!(delivered, 1);

    wait_for(&audit, 1).await;
    let records = audit.recent(1).await;
    assert_eq!(records[0].event, "payment.captured");
    assert_eq!(records[0].provider, Provider::PayPal);
    assert_eq!(records[0].amount_cents, Some(4_999));
    assert_eq!(records[0].reference.as_deref(), Some("WH-1"));
}

#[tokio::test]
async fn file_trail_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = AuditConfig { path: Some(dir.path().join("audit/trail.jsonl")), capacity: 16 };

    let first = AuditTrail::open(&config).await.unwrap();
    for kind in ["checkout.completed", "invoice.paid"] {
        first.record(&PaymentActivity::new(Provider::Stripe, kind)).await.unwrap();
    }
    drop(first);

    let reopened = AuditTrail::open(&config).await.unwrap();
    assert_eq!(reopened.len().await, 2);

    let next = reopened.record(&PaymentActivity::new(Provider::Stripe, "payment.failed")).await.unwrap();
    assert_eq!(next.sequence, 2);

    let records = reopened.recent(10).await;
    assert_eq!(records.len(), 3);
    assert!(verify_chain(&records));
}

#[tokio::test]
async fn edited_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trail.jsonl");
    let config = AuditConfig { path: Some(path.clone()), capacity: 16 };

    let trail = AuditTrail::open(&config).await.unwrap();
    trail
        .record(&PaymentActivity::new(Provider::Stripe, "invoice.paid").amount(Some(1_000)))
        .await
        .unwrap();
    drop(trail);

    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("\"amount_cents\":1000", "\"amount_cents\":1")).unwrap();

    let err = AuditTrail::open(&config).await.unwrap_err();
    assert!(matches!(err, AuditError::Tampered { .. }));
}

#[tokio::test]
async fn listener_stops_on_bus_shutdown() {
    let bus = EventBus::new();
    let audit = Audit::new(AuditTrail::in_memory(4));
    let handle = audit.spawn_listener(&bus).unwrap();

    bus.shutdown();
    tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn queued_activity_is_recorded_before_the_listener_exits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trail.jsonl");
    let config = AuditConfig { path: Some(path.clone()), capacity: 4 };

    let bus = EventBus::new();
    let (audit, _slice, listener) = init(&config, &bus).await.unwrap();

    for n in 0..20 {
        bus.publish(PaymentActivity::new(Provider::Stripe, "invoice.paid").amount(Some(n))).unwrap();
    }
    bus.shutdown();
    tokio::time::timeout(Duration::from_secs(5), listener).await.unwrap().unwrap();

    assert_eq!(audit.len().await, 20);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 20);
}
