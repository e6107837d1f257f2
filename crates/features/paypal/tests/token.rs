use qpay_paypal::{PayPalError, TokenCache};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn token_is_fetched_with_client_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = TokenCache::new(reqwest::Client::new(), server.uri(), "id", "secret");
    assert_eq!(cache.access_token().await.unwrap(), "tok-1");
    // Default lifetime applies when `expires_in` is absent; the second call is served from cache.
    assert_eq!(cache.access_token().await.unwrap(), "tok-1");
}

#[tokio::test]
async fn invalidate_forces_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok", "expires_in": 3600 })))
        .expect(2)
        .mount(&server)
        .await;

    let cache = TokenCache::new(reqwest::Client::new(), server.uri(), "id", "secret");
    cache.access_token().await.unwrap();
    cache.invalidate().await;
    cache.access_token().await.unwrap();
}

#[tokio::test]
async fn short_lived_tokens_are_not_reused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok", "expires_in": 30 })))
        .expect(2)
        .mount(&server)
        .await;

    let cache = TokenCache::new(reqwest::Client::new(), server.uri(), "id", "secret");
    cache.access_token().await.unwrap();
    cache.access_token().await.unwrap();
}

#[tokio::test]
async fn response_without_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "scope": "openid" })))
        .mount(&server)
        .await;

    let cache = TokenCache::new(reqwest::Client::new(), server.uri(), "id", "secret");
    assert!(matches!(cache.access_token().await, Err(PayPalError::Auth { .. })));
}

#[tokio::test]
async fn non_success_status_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = TokenCache::new(reqwest::Client::new(), server.uri(), "id", "secret");
    assert!(matches!(cache.access_token().await, Err(PayPalError::Auth { .. })));
}
