//! HTTP routers for the authorization and resource servers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::oauth::AuthorizationServer;
use super::oauth::guard::{ResourceGuard, require_bearer};
use super::oauth::handlers::{
    AuthState, ResourceState, handle_auth_server_metadata, handle_protected_resource,
    handle_resource, handle_token,
};

/// Create the authorization server router.
///
/// Routes: `/`, `/health`, `POST /token`, `GET /.well-known/oauth-authorization-server`.
pub fn create_auth_router(
    server: AuthorizationServer,
    base_url: String,
    request_timeout: Duration,
) -> Router {
    with_layers(health_routes().merge(auth_routes(server, base_url)), request_timeout)
}

/// Create the protected resource router.
///
/// `/resource` sits behind the bearer guard; health and metadata routes do not.
pub fn create_resource_router(
    guard: ResourceGuard,
    base_url: String,
    authorization_server: String,
    request_timeout: Duration,
) -> Router {
    with_layers(
        health_routes().merge(resource_routes(guard, base_url, authorization_server)),
        request_timeout,
    )
}

/// Both roles in one router sharing the authorization server's token store.
pub fn create_combined_router(
    server: AuthorizationServer,
    base_url: String,
    request_timeout: Duration,
) -> Router {
    let guard = ResourceGuard::new(Arc::clone(server.store()));
    let resource = resource_routes(guard, base_url.clone(), base_url.clone());

    with_layers(
        health_routes().merge(auth_routes(server, base_url)).merge(resource),
        request_timeout,
    )
}

fn auth_routes(server: AuthorizationServer, base_url: String) -> Router {
    let state = Arc::new(AuthState { server, base_url });

    Router::new()
        .route("/token", post(handle_token))
        .route("/.well-known/oauth-authorization-server", get(handle_auth_server_metadata))
        .with_state(state)
}

fn resource_routes(guard: ResourceGuard, base_url: String, authorization_server: String) -> Router {
    let state = Arc::new(ResourceState { base_url, authorization_server });

    Router::new()
        .route("/resource", post(handle_resource).get(handle_resource))
        .route_layer(middleware::from_fn_with_state(guard, require_bearer))
        .route("/.well-known/oauth-protected-resource", get(handle_protected_resource))
        .with_state(state)
}

fn health_routes() -> Router {
    Router::new().route("/", get(health_check)).route("/health", get(health_check))
}

fn with_layers(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "oauth-grants",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
