use axum::Router;
use qpay::kernel::server::ApiState;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiDoc;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(info(title = "QPay", description = "Payment provider webhooks and billing portal"))]
struct ApiDoc;

pub(crate) fn init(state: ApiState) -> Router {
    let (routes, api_doc) = split(state);

    // Interactive reference for the routes above
    let scalar_routes = Scalar::with_url("/api", api_doc);

    Router::new().merge(routes).merge(scalar_routes)
}

/// The OpenAPI document describing every enabled route.
pub(crate) fn openapi() -> OpenApiDoc {
    OpenApiRouter::<ApiState>::with_openapi(ApiDoc::openapi())
        .merge(qpay::server::router::api_router())
        .into_openapi()
}

fn split(state: ApiState) -> (Router, OpenApiDoc) {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(qpay::server::router::api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .split_for_parts()
}
