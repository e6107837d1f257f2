use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use qpay_cache::IdempotencyStore;
use qpay_domain::config::{ApiConfig, StripeConfig};
use qpay_event_bus::EventBus;
use qpay_kernel::server::ApiState;
use qpay_stripe::PortalSessionResponse;
use qpay_subscriptions::Subscriptions;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn app(api_base: &str, secret_key: &str) -> Router {
    let stripe_config = StripeConfig {
        secret_key: secret_key.to_owned(),
        api_base: api_base.to_owned(),
        ..StripeConfig::default()
    };
    let mut config = ApiConfig::default();
    config.stripe = stripe_config.clone();

    let events = EventBus::new();
    let slice = qpay_stripe::init(&stripe_config, Subscriptions::default(), events.clone()).unwrap();
    let state = ApiState::builder()
        .config(config)
        .events(events)
        .idempotency(IdempotencyStore::builder().build().await)
        .register_slice(slice)
        .build()
        .unwrap();

    let (router, _) = qpay_stripe::router().split_for_parts();
    router.with_state(state)
}

fn portal_request(body: &serde_json::Value) -> Request<Body> {
    Request::post("/stripe/portal")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn creates_portal_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/billing_portal/sessions"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("customer=cus_123"))
        .and(body_string_contains("return_url="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "bps_1",
            "object": "billing_portal.session",
            "url": "https://billing.stripe.com/p/session/test_abc",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server.uri(), "sk_test_123").await;
    let response = app
        .oneshot(portal_request(&json!({ "customer_id": "cus_123", "return_url": "https://qantum.example/account" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let session: PortalSessionResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(session.url, "https://billing.stripe.com/p/session/test_abc");
}

#[tokio::test]
async fn missing_customer_is_bad_request() {
    let server = MockServer::start().await;
    let app = app(&server.uri(), "sk_test_123").await;

    for body in [json!({}), json!({ "customer_id": "  " })] {
        let response = app.clone().oneshot(portal_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn stripe_rejection_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/billing_portal/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "No such customer: 'cus_missing'" }
        })))
        .mount(&server)
        .await;

    let app = app(&server.uri(), "sk_test_123").await;
    let response = app.oneshot(portal_request(&json!({ "customer_id": "cus_missing" }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn missing_secret_key_is_unavailable() {
    let server = MockServer::start().await;
    let app = app(&server.uri(), "").await;

    let response = app.oneshot(portal_request(&json!({ "customer_id": "cus_123" }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
