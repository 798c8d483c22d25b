//! Wire DTOs for both the `rpc/v1` and `api` surfaces, mirroring the
//! protobuf messages named in spec.md §6 field-for-field. Field names use
//! camelCase to match the protobuf-JSON mapping convention.

use chrono::{DateTime, Utc};
use pinguin_core::{Attachment, Notification, NotificationType, Status};
use serde::{Deserialize, Serialize};

/// `Status::Inflight` is an internal leasing state (spec.md §4.6) never
/// exposed on the wire; a leased row is reported as still `QUEUED` to
/// callers, matching the enumerated client-facing set in spec.md §3/§6.
fn wire_status(status: Status) -> &'static str {
    match status {
        Status::Queued | Status::Inflight => "QUEUED",
        Status::Sent => "SENT",
        Status::Failed => "FAILED",
        Status::Cancelled => "CANCELLED",
        Status::Errored => "ERRORED",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub scheduled_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub notification_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
    pub attachments: Vec<Attachment>,
    pub status: &'static str,
    pub provider_message_id: Option<String>,
    pub retry_count: u32,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            notification_id: n.notification_id.to_string(),
            kind: n.kind,
            recipient: n.recipient,
            subject: n.subject,
            message: n.message,
            attachments: n.attachments,
            status: wire_status(n.status),
            provider_message_id: n.provider_message_id,
            retry_count: n.retry_count,
            scheduled_time: n.scheduled_time,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    /// Comma-separated status filter, e.g. `?status=QUEUED,ERRORED`. Absent
    /// or empty means "any status".
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsResponse {
    pub notifications: Vec<NotificationResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleNotificationRequest {
    pub scheduled_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflight_status_reports_as_queued_on_the_wire() {
        assert_eq!(wire_status(Status::Inflight), "QUEUED");
        assert_eq!(wire_status(Status::Queued), "QUEUED");
        assert_eq!(wire_status(Status::Sent), "SENT");
    }

    #[test]
    fn request_deserializes_camel_case_fields() {
        let json = serde_json::json!({
            "type": "EMAIL",
            "recipient": "user@example.com",
            "message": "hello",
            "scheduledTime": null,
        });
        let req: SendNotificationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.recipient, "user@example.com");
        assert!(req.attachments.is_empty());
    }
}
