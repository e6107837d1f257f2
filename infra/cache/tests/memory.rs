use qpay_cache::{EventResult, IdempotencyStore};
use qpay_domain::payments::Provider;
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn unknown_event_is_not_processed() {
    let store = IdempotencyStore::builder().build().await;
    assert_eq!(store.backend(), "memory");
    assert!(store.lookup(Provider::Stripe, "evt_missing").await.is_none());
    assert!(!store.is_processed(Provider::Stripe, "evt_missing").await);
}

#[tokio::test]
async fn marked_event_is_processed_and_keeps_its_result() {
    let store = IdempotencyStore::builder().build().await;
    let user_id = Uuid::new_v4();

    store
        .mark_processed(
            Provider::Stripe,
            "evt_1",
            EventResult::Success { user_id, plan: "pro_monthly".to_owned() },
        )
        .await;

    assert!(store.is_processed(Provider::Stripe, "evt_1").await);
    let record = store.lookup(Provider::Stripe, "evt_1").await.unwrap();
    assert_eq!(record.event_id, "evt_1");
    assert_eq!(record.result, EventResult::Success { user_id, plan: "pro_monthly".to_owned() });
}

#[tokio::test]
async fn providers_do_not_share_ids() {
    let store = IdempotencyStore::builder().build().await;
    store.mark_processed(Provider::PayPal, "same-id", EventResult::Handled).await;

    assert!(store.is_processed(Provider::PayPal, "same-id").await);
    assert!(!store.is_processed(Provider::Stripe, "same-id").await);
}

#[tokio::test]
async fn failed_events_stay_retryable() {
    let store = IdempotencyStore::builder().build().await;
    store
        .mark_processed(Provider::Stripe, "evt_f", EventResult::Failed { error: "db down".to_owned() })
        .await;

    assert!(store.lookup(Provider::Stripe, "evt_f").await.is_some());
    assert!(!store.is_processed(Provider::Stripe, "evt_f").await);

    store.mark_processed(Provider::Stripe, "evt_f", EventResult::Handled).await;
    assert!(store.is_processed(Provider::Stripe, "evt_f").await);
}

#[tokio::test]
async fn records_expire_after_ttl() {
    let store = IdempotencyStore::builder().ttl(Duration::from_millis(50)).build().await;
    store.mark_processed(Provider::Stripe, "evt_ttl", EventResult::Ignored).await;
    assert!(store.is_processed(Provider::Stripe, "evt_ttl").await);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!store.is_processed(Provider::Stripe, "evt_ttl").await);
}

#[tokio::test]
async fn invalid_redis_url_falls_back_to_memory() {
    let store = IdempotencyStore::builder().redis_url(Some("http://not-redis".to_owned())).build().await;
    assert_eq!(store.backend(), "memory");

    store.mark_processed(Provider::Stripe, "evt_2", EventResult::Handled).await;
    assert!(store.is_processed(Provider::Stripe, "evt_2").await);
}

#[tokio::test]
async fn blank_redis_url_is_ignored() {
    let store = IdempotencyStore::builder().redis_url(Some("  ".to_owned())).build().await;
    assert_eq!(store.backend(), "memory");
}

#[tokio::test]
async fn only_one_concurrent_claim_wins() {
    let store = IdempotencyStore::builder().build().await;

    let attempts: Vec<_> = (0..64)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.claim(Provider::Stripe, "evt_race").await })
        })
        .collect();

    let mut winners = 0;
    for attempt in attempts {
        if attempt.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn released_claim_can_be_taken_again() {
    let store = IdempotencyStore::builder().build().await;

    assert!(store.claim(Provider::PayPal, "WH-claim").await);
    assert!(!store.claim(Provider::PayPal, "WH-claim").await);
    assert!(store.claim(Provider::Stripe, "WH-claim").await, "claims are per provider");

    store.release(Provider::PayPal, "WH-claim").await;
    assert!(store.claim(Provider::PayPal, "WH-claim").await);
}

#[tokio::test]
async fn abandoned_claim_expires() {
    let store = IdempotencyStore::builder().claim_ttl(Duration::from_millis(50)).build().await;
    assert!(store.claim(Provider::Stripe, "evt_crash").await);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(store.claim(Provider::Stripe, "evt_crash").await);
}
