use pinguin_core::Notification;
use pinguin_provider::{Outcome, Provider, ProviderError};
use tracing::{debug, instrument};

use crate::backend::{EmailBackend, EmailSendError};
use crate::config::SmtpConfig;
use crate::smtp::SmtpBackend;
use crate::types::EmailMessage;

/// The EMAIL dispatch adapter (C4). Constructed fresh per tenant by the
/// dispatcher from that tenant's decrypted `TenantRuntime.email`, so
/// credentials never cross a tenant boundary.
pub struct EmailAdapter {
    from_address: String,
    backend: Box<dyn EmailBackend>,
}

impl std::fmt::Debug for EmailAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailAdapter")
            .field("from_address", &self.from_address)
            .field("backend", &self.backend)
            .finish()
    }
}

impl EmailAdapter {
    pub fn new(config: SmtpConfig) -> Result<Self, ProviderError> {
        let from_address = config.from_address.clone();
        let backend = SmtpBackend::new(config)?;
        Ok(Self {
            from_address,
            backend: Box::new(backend),
        })
    }

    /// Construct with a pre-built backend (for tests / alternative transports).
    pub fn with_backend(from_address: impl Into<String>, backend: Box<dyn EmailBackend>) -> Self {
        Self {
            from_address: from_address.into(),
            backend,
        }
    }
}

impl Provider for EmailAdapter {
    fn name(&self) -> &str {
        "email"
    }

    #[instrument(skip(self, notification), fields(notification_id = %notification.notification_id, provider = "email"))]
    async fn execute(&self, notification: &Notification) -> Result<Outcome, ProviderError> {
        let message = EmailMessage::from_notification(notification, &self.from_address);

        debug!(to = %message.to, backend = self.backend.backend_name(), "sending email");

        match self.backend.send(&message).await {
            Ok(result) => Ok(Outcome::Delivered {
                provider_message_id: result.message_id.unwrap_or_else(|| notification.notification_id.to_string()),
            }),
            Err(EmailSendError::Permanent(reason)) => Ok(Outcome::PermanentFailure { reason }),
            Err(EmailSendError::Transient(reason)) => Ok(Outcome::TransientFailure { reason }),
        }
    }

    #[instrument(skip(self), fields(provider = "email"))]
    async fn health_check(&self) -> Result<(), ProviderError> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use pinguin_core::{NewNotification, NotificationType};

    use super::*;
    use crate::backend::EmailResult;

    #[derive(Debug)]
    struct StubBackend {
        outcome: Result<EmailResult, EmailSendError>,
    }

    #[async_trait]
    impl EmailBackend for StubBackend {
        async fn send(&self, _message: &EmailMessage) -> Result<EmailResult, EmailSendError> {
            match &self.outcome {
                Ok(result) => Ok(result.clone()),
                Err(EmailSendError::Permanent(reason)) => Err(EmailSendError::Permanent(reason.clone())),
                Err(EmailSendError::Transient(reason)) => Err(EmailSendError::Transient(reason.clone())),
            }
        }

        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "stub"
        }
    }

    fn sample_notification() -> Notification {
        Notification::create(
            NewNotification {
                tenant_id: "acme".into(),
                kind: NotificationType::Email,
                recipient: "user@example.com".into(),
                subject: Some("hi".into()),
                message: "hello".into(),
                attachments: vec![],
                scheduled_time: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn delivered_maps_to_outcome_delivered() {
        let adapter = EmailAdapter::with_backend(
            "noreply@acme.test",
            Box::new(StubBackend {
                outcome: Ok(EmailResult {
                    message_id: Some("msg-1".into()),
                }),
            }),
        );
        let outcome = Provider::execute(&adapter, &sample_notification()).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Delivered {
                provider_message_id: "msg-1".into()
            }
        );
    }

    #[tokio::test]
    async fn permanent_send_error_maps_to_permanent_failure() {
        let adapter = EmailAdapter::with_backend(
            "noreply@acme.test",
            Box::new(StubBackend {
                outcome: Err(EmailSendError::Permanent("mailbox unavailable".into())),
            }),
        );
        let outcome = Provider::execute(&adapter, &sample_notification()).await.unwrap();
        assert!(matches!(outcome, Outcome::PermanentFailure { .. }));
    }

    #[tokio::test]
    async fn transient_send_error_maps_to_transient_failure() {
        let adapter = EmailAdapter::with_backend(
            "noreply@acme.test",
            Box::new(StubBackend {
                outcome: Err(EmailSendError::Transient("connection reset".into())),
            }),
        );
        let outcome = Provider::execute(&adapter, &sample_notification()).await.unwrap();
        assert!(matches!(outcome, Outcome::TransientFailure { .. }));
    }
}
