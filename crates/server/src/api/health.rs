use axum::Extension;
use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::service;
use crate::state::AppState;

/// `GET /api/health` -- unauthenticated process liveness. Always `200 OK`
/// once the server is accepting connections.
pub async fn live() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /api/v1/health` -- tenant-scoped readiness: calls each provider the
/// caller's tenant has configured and reports real reachability, not just
/// `enabled`. Supplements spec.md's RPC surface, which has no equivalent
/// check.
pub async fn tenant_ready(State(state): State<AppState>, Extension(identity): Extension<CallerIdentity>) -> Result<Json<serde_json::Value>, ApiError> {
    let health = service::tenant_health(&state, &identity.tenant_id).await?;
    Ok(Json(serde_json::json!({
        "tenantId": identity.tenant_id,
        "healthy": health.is_healthy(),
        "enabled": health.enabled,
        "providers": health.providers,
    })))
}
