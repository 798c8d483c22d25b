//! The `rpc/v1` surface: bearer-token-authenticated, JSON-over-HTTP,
//! mirroring a gRPC service definition (spec.md §6) without an actual
//! protobuf/tonic transport underneath it.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};

use crate::auth::rpc_tenant_resolver;
use crate::handlers;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let body_limit = state.limits.max_message_size_bytes;
    Router::new()
        .route("/rpc/v1/notifications", post(handlers::send).get(handlers::list))
        .route("/rpc/v1/notifications/{id}", get(handlers::get_status))
        .route("/rpc/v1/notifications/{id}/reschedule", post(handlers::reschedule))
        .route("/rpc/v1/notifications/{id}/cancel", post(handlers::cancel))
        .layer(middleware::from_fn_with_state(state.clone(), rpc_tenant_resolver))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
