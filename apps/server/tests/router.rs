use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use qpay::domain::config::ApiConfig;
use qpay_server::Server;
use serde_json::Value;
use tower::ServiceExt;

async fn server() -> Server {
    Server::builder().config(ApiConfig::default()).build().await.unwrap()
}

#[tokio::test]
async fn health_reports_up() {
    let app = server().await.router();

    let response = app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store, no-cache, must-revalidate");

    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["status"], "up");
    assert_eq!(body["idempotency"], "memory");
    assert!(body["uptime"].is_u64());
}

#[tokio::test]
async fn provider_routes_are_mounted() {
    let app = server().await.router();

    let stripe = Request::post("/stripe/webhook").body(Body::from("{}")).unwrap();
    let response = app.clone().oneshot(stripe).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let paypal = Request::post("/paypal/webhook").body(Body::from("not json")).unwrap();
    let response = app.clone().oneshot(paypal).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let missing = Request::get("/nope").body(Body::empty()).unwrap();
    assert_eq!(app.oneshot(missing).await.unwrap().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_reference_is_served() {
    let app = server().await.router();

    let response = app.oneshot(Request::get("/api").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn openapi_lists_every_route() {
    let doc = Server::openapi();
    for path in ["/health", "/stripe/webhook", "/stripe/portal", "/paypal/webhook"] {
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }
}

#[tokio::test]
async fn missing_ssl_files_fail_the_build() {
    let mut cfg = ApiConfig::default();
    cfg.server.ssl = Some(qpay::domain::config::SslConfig {
        cert: "/definitely/missing/cert.pem".into(),
        key: "/definitely/missing/key.pem".into(),
    });

    let err = Server::builder().config(cfg).build().await.unwrap_err();
    assert!(err.to_string().contains("SSL certificate not found"));
}
