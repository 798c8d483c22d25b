use pinguin_core::{Attachment, Notification};

/// A unified email message built from a queued [`Notification`] plus the
/// tenant's configured `from_address`.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    #[must_use]
    pub fn from_notification(notification: &Notification, from_address: &str) -> Self {
        Self {
            from: from_address.to_owned(),
            to: notification.recipient.clone(),
            subject: notification.subject.clone().unwrap_or_default(),
            body: notification.message.clone(),
            attachments: notification.attachments.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pinguin_core::{NewNotification, NotificationType};

    use super::*;

    #[test]
    fn builds_message_from_notification() {
        let notification = Notification::create(
            NewNotification {
                tenant_id: "acme".into(),
                kind: NotificationType::Email,
                recipient: "user@example.com".into(),
                subject: Some("Welcome".into()),
                message: "hello".into(),
                attachments: vec![],
                scheduled_time: None,
            },
            Utc::now(),
        )
        .unwrap();

        let message = EmailMessage::from_notification(&notification, "noreply@acme.test");
        assert_eq!(message.from, "noreply@acme.test");
        assert_eq!(message.to, "user@example.com");
        assert_eq!(message.subject, "Welcome");
        assert_eq!(message.body, "hello");
    }
}
