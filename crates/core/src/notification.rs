use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::error::{PinguinError, Result};
use crate::types::{NotificationId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationType {
    Email,
    Sms,
}

/// Delivery status. `Inflight` is not part of spec.md §3's enumerated
/// client-facing set but is required by the §4.6 state machine as the
/// leased-for-dispatch state between `Queued` and a terminal/`Errored`
/// outcome; it is never observable in a `Create` response and is reset to
/// `Queued` on boot (crash recovery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Queued,
    Inflight,
    Sent,
    Failed,
    Cancelled,
    Errored,
}

impl Status {
    /// `SENT` and `CANCELLED` are terminal; everything else may still
    /// transition.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub tenant_id: TenantId,
    pub notification_id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
    pub attachments: Vec<Attachment>,
    pub status: Status,
    pub provider_message_id: Option<String>,
    pub retry_count: u32,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies when submitting a notification; the store
/// assigns the id, clamps timestamps, and sets the initial status.
pub struct NewNotification {
    pub tenant_id: TenantId,
    pub kind: NotificationType,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
    pub attachments: Vec<Attachment>,
    pub scheduled_time: Option<DateTime<Utc>>,
}

impl Notification {
    /// Validates the request-supplied fields and materializes a freshly
    /// `Queued` row with a new id and `created_at == updated_at == now`.
    /// `subject`/`attachments` are only meaningful for `EMAIL`; SMS requests
    /// carrying either are rejected rather than silently ignored.
    pub fn create(new: NewNotification, now: DateTime<Utc>) -> Result<Self> {
        if new.recipient.trim().is_empty() {
            return Err(PinguinError::invalid_argument("recipient must not be blank"));
        }
        if new.message.trim().is_empty() {
            return Err(PinguinError::invalid_argument("message must not be blank"));
        }
        if new.kind == NotificationType::Sms {
            if new.subject.is_some() {
                return Err(PinguinError::invalid_argument("subject is EMAIL-only"));
            }
            if !new.attachments.is_empty() {
                return Err(PinguinError::invalid_argument("attachments are EMAIL-only"));
            }
        }
        Ok(Self {
            tenant_id: new.tenant_id,
            notification_id: NotificationId::new(),
            kind: new.kind,
            recipient: new.recipient,
            subject: new.subject,
            message: new.message,
            attachments: new.attachments,
            status: Status::Queued,
            provider_message_id: None,
            retry_count: 0,
            scheduled_time: new.scheduled_time,
            created_at: now,
            updated_at: now,
        })
    }
}
