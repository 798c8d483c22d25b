//! The `api` surface (C9): a one-to-one JSON/HTTP mirror of `rpc/v1`,
//! authenticated via the TAuth session cookie instead of a bearer token, for
//! the tenant-admin UI.

pub mod health;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::http_tenant_resolver;
use crate::handlers;
use crate::state::AppState;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|origin| origin.parse().ok()).collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(tower_http::cors::Any).allow_headers(tower_http::cors::Any)
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let body_limit = state.limits.max_message_size_bytes;
    let public = Router::new().route("/api/health", get(health::live));

    let protected = Router::new()
        .route("/api/v1/health", get(health::tenant_ready))
        .route("/api/v1/notifications", post(handlers::send).get(handlers::list))
        .route("/api/v1/notifications/{id}", get(handlers::get_status))
        .route("/api/v1/notifications/{id}/reschedule", post(handlers::reschedule))
        .route("/api/v1/notifications/{id}/cancel", post(handlers::cancel))
        .layer(middleware::from_fn_with_state(state.clone(), http_tenant_resolver));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
