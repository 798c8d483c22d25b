//! Shared business logic behind both the `rpc/v1` and `api` surfaces
//! (spec.md §4.9: "the HTTP surface is a one-to-one mirror of the RPC
//! surface"). Handlers on each surface only translate wire DTOs and call
//! into these functions, so the two surfaces can never drift in behavior.

use chrono::Utc;
use pinguin_core::{Attachment, NewNotification, NotificationId, NotificationType, PinguinError, Status, TenantId};

use crate::auth::CallerIdentity;
use crate::dto::{ListNotificationsQuery, NotificationResponse, SendNotificationRequest};
use crate::state::AppState;

fn total_attachment_bytes(attachments: &[Attachment]) -> usize {
    attachments.iter().map(|a| a.bytes.len()).sum()
}

/// C1/C2: validates and persists a new notification. If `scheduledTime` is
/// absent or already due, dispatches it synchronously (spec.md §4.8) and
/// returns the resulting row; otherwise returns the freshly created
/// `QUEUED` row for the scheduler (C6) to pick up on a later tick.
pub async fn send_notification(state: &AppState, identity: &CallerIdentity, req: SendNotificationRequest) -> Result<NotificationResponse, PinguinError> {
    if matches!(req.kind, NotificationType::Sms) && (req.subject.is_some() || !req.attachments.is_empty()) {
        return Err(PinguinError::invalid_argument("subject and attachments are only valid for EMAIL notifications"));
    }

    if total_attachment_bytes(&req.attachments) > state.limits.max_payload_bytes {
        return Err(PinguinError::resource_exhausted("attachment payload exceeds the configured size limit"));
    }

    let now = Utc::now();
    let due_now = req.scheduled_time.is_none_or(|t| t <= now);

    let new = NewNotification {
        tenant_id: identity.tenant_id.clone(),
        kind: req.kind,
        recipient: req.recipient,
        subject: req.subject,
        message: req.message,
        attachments: req.attachments,
        scheduled_time: req.scheduled_time,
    };

    let notification = state.notification_store.create(new, now).await?;

    if due_now {
        // A transient adapter failure lands the row in ERRORED and is
        // reported as a successful submission (spec.md §7: "TransientFailure
        // never escapes to the caller of a synchronous Send"); only a lost
        // CAS lease (another caller already moved the row) is unexpected
        // here, so it falls back to returning the pre-dispatch row.
        match state.dispatcher.dispatch(&notification).await {
            Ok(dispatched) => return Ok(dispatched.into()),
            Err(pinguin_dispatcher::DispatchError::LeaseLost) => {}
            Err(other) => tracing::warn!(error = %other, "inline dispatch failed unexpectedly"),
        }
    }

    Ok(notification.into())
}

/// C3: fetches a single notification's current status, scoped to the
/// caller's tenant.
pub async fn get_notification_status(state: &AppState, identity: &CallerIdentity, notification_id: NotificationId) -> Result<NotificationResponse, PinguinError> {
    let notification = state.notification_store.get(&identity.tenant_id, &notification_id).await?;
    Ok(notification.into())
}

/// C4: lists notifications for the caller's tenant, optionally filtered by
/// status, with pagination capped at `limits.max_page_size`.
pub async fn list_notifications(state: &AppState, identity: &CallerIdentity, query: ListNotificationsQuery) -> Result<Vec<NotificationResponse>, PinguinError> {
    let statuses = parse_status_filter(query.status.as_deref())?;
    let limit = query.limit.unwrap_or(state.limits.max_page_size).clamp(1, state.limits.max_page_size);
    let offset = query.offset.unwrap_or(0).max(0);

    let notifications = state.notification_store.list(&identity.tenant_id, &statuses, limit, offset).await?;
    Ok(notifications.into_iter().map(Into::into).collect())
}

fn parse_status_filter(raw: Option<&str>) -> Result<Vec<Status>, PinguinError> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(|s| match s.trim() {
            "QUEUED" => Ok(Status::Queued),
            "SENT" => Ok(Status::Sent),
            "FAILED" => Ok(Status::Failed),
            "CANCELLED" => Ok(Status::Cancelled),
            "ERRORED" => Ok(Status::Errored),
            other => Err(PinguinError::invalid_argument(format!("unknown status filter: {other}"))),
        })
        .collect()
}

/// C5: reschedules a `QUEUED` notification to a new `scheduledTime`.
pub async fn reschedule_notification(
    state: &AppState,
    identity: &CallerIdentity,
    notification_id: NotificationId,
    new_scheduled_time: chrono::DateTime<Utc>,
) -> Result<(), PinguinError> {
    state.notification_store.reschedule(&identity.tenant_id, &notification_id, new_scheduled_time, Utc::now()).await?;
    Ok(())
}

/// C5: cancels a notification, idempotently if it's already cancelled.
pub async fn cancel_notification(state: &AppState, identity: &CallerIdentity, notification_id: NotificationId) -> Result<(), PinguinError> {
    state.notification_store.cancel(&identity.tenant_id, &notification_id, Utc::now()).await?;
    Ok(())
}

/// Supplemented: reports real per-provider reachability for the caller's
/// tenant by calling each configured adapter's `health_check()`, backing
/// the `/api/v1/health` endpoint. A disabled tenant is reported unhealthy
/// outright, without exercising its providers.
pub async fn tenant_health(state: &AppState, tenant_id: &TenantId) -> Result<TenantHealth, PinguinError> {
    let runtime = state.tenant_store.runtime_for(tenant_id).await?;
    if !runtime.enabled {
        return Ok(TenantHealth {
            enabled: false,
            providers: pinguin_dispatcher::ProviderHealth::default(),
        });
    }

    let providers = state.dispatcher.check_health(tenant_id).await?;
    Ok(TenantHealth { enabled: true, providers })
}

/// Wire-facing shape for the supplemented tenant health surface.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct TenantHealth {
    pub enabled: bool,
    #[serde(flatten)]
    pub providers: pinguin_dispatcher::ProviderHealth,
}

impl TenantHealth {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.enabled && self.providers.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_parses_known_statuses() {
        let statuses = parse_status_filter(Some("QUEUED,ERRORED")).unwrap();
        assert_eq!(statuses, vec![Status::Queued, Status::Errored]);
    }

    #[test]
    fn status_filter_rejects_unknown_values() {
        let err = parse_status_filter(Some("BOGUS")).unwrap_err();
        assert_eq!(err.kind, pinguin_core::ErrorKind::InvalidArgument);
    }

    #[test]
    fn status_filter_empty_means_unfiltered() {
        assert!(parse_status_filter(None).unwrap().is_empty());
        assert!(parse_status_filter(Some("")).unwrap().is_empty());
    }
}
