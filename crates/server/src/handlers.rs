//! Handler bodies shared verbatim by the `rpc/v1` and `api` routers (spec.md
//! §4.9: the HTTP surface mirrors the RPC surface one for one). Both
//! `rpc::router` and `api::router` wire these same functions behind their
//! own tenant-resolver middleware.

use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, response::Response};
use pinguin_core::{NotificationId, PinguinError};
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::dto::{ListNotificationsQuery, ListNotificationsResponse, NotificationResponse, RescheduleNotificationRequest, SendNotificationRequest};
use crate::error::ApiError;
use crate::service;
use crate::state::AppState;

fn parse_notification_id(raw: &str) -> Result<NotificationId, ApiError> {
    Uuid::parse_str(raw)
        .map(NotificationId::from)
        .map_err(|_| ApiError(PinguinError::invalid_argument("invalid notification id")))
}

/// C1: create and enqueue a notification.
pub async fn send(State(state): State<AppState>, Extension(identity): Extension<CallerIdentity>, Json(req): Json<SendNotificationRequest>) -> Result<Response, ApiError> {
    let notification = service::send_notification(&state, &identity, req).await?;
    Ok((StatusCode::CREATED, Json(notification)).into_response())
}

/// C3: look up a notification's current status.
pub async fn get_status(State(state): State<AppState>, Extension(identity): Extension<CallerIdentity>, Path(id): Path<String>) -> Result<Json<NotificationResponse>, ApiError> {
    let id = parse_notification_id(&id)?;
    let notification = service::get_notification_status(&state, &identity, id).await?;
    Ok(Json(notification))
}

/// C4: list notifications for the caller's tenant.
pub async fn list(State(state): State<AppState>, Extension(identity): Extension<CallerIdentity>, Query(query): Query<ListNotificationsQuery>) -> Result<Json<ListNotificationsResponse>, ApiError> {
    let notifications = service::list_notifications(&state, &identity, query).await?;
    Ok(Json(ListNotificationsResponse { notifications }))
}

/// C5: reschedule a still-queued notification.
pub async fn reschedule(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<String>,
    Json(req): Json<RescheduleNotificationRequest>,
) -> Result<StatusCode, ApiError> {
    let id = parse_notification_id(&id)?;
    service::reschedule_notification(&state, &identity, id, req.scheduled_time).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// C5: cancel a notification.
pub async fn cancel(State(state): State<AppState>, Extension(identity): Extension<CallerIdentity>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let id = parse_notification_id(&id)?;
    service::cancel_notification(&state, &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
