use async_trait::async_trait;
use lettre::message::{Attachment as LettreAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pinguin_provider::ProviderError;
use secrecy::ExposeSecret;
use tracing::{debug, error, info};

use crate::backend::{EmailBackend, EmailResult, EmailSendError};
use crate::config::SmtpConfig;
use crate::types::EmailMessage;

/// SMTP email delivery backend using `lettre`.
pub struct SmtpBackend {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpBackend")
            .field("config", &self.config)
            .field("transport", &"<AsyncSmtpTransport>")
            .finish()
    }
}

impl SmtpBackend {
    pub fn new(config: SmtpConfig) -> Result<Self, ProviderError> {
        let transport = build_transport(&config)?;
        Ok(Self { config, transport })
    }

    /// Create a `SmtpBackend` with a pre-built transport (for testing).
    pub fn with_transport(config: SmtpConfig, transport: AsyncSmtpTransport<Tokio1Executor>) -> Self {
        Self { config, transport }
    }
}

#[async_trait]
impl EmailBackend for SmtpBackend {
    async fn send(&self, message: &EmailMessage) -> Result<EmailResult, EmailSendError> {
        debug!(to = %message.to, subject = %message.subject, "building SMTP message");
        let lettre_message = build_message(message).map_err(EmailSendError::Permanent)?;

        info!(to = %message.to, subject = %message.subject, "sending email via SMTP");
        self.transport.send(lettre_message).await.map_err(|e| {
            error!(error = %e, "SMTP send failed");
            map_smtp_error(&e)
        })?;

        info!(to = %message.to, "email sent successfully via SMTP");
        Ok(EmailResult { message_id: None })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        debug!("performing SMTP health check");
        self.transport.test_connection().await.map_err(|e| {
            error!(error = %e, "SMTP health check failed");
            ProviderError::Connection(format!("SMTP health check failed: {e}"))
        })?;
        info!("SMTP health check passed");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "smtp"
    }
}

/// Build a `lettre::Message` from the unified [`EmailMessage`], including
/// MIME attachment parts for EMAIL notifications that carry them.
fn build_message(msg: &EmailMessage) -> Result<Message, String> {
    let from_mailbox: Mailbox = msg
        .from
        .parse()
        .map_err(|e| format!("invalid from address: {e}"))?;
    let to_mailbox: Mailbox = msg
        .to
        .parse()
        .map_err(|e| format!("invalid recipient address: {e}"))?;

    let builder = Message::builder().from(from_mailbox).to(to_mailbox).subject(&msg.subject);

    if msg.attachments.is_empty() {
        return builder
            .body(msg.body.clone())
            .map_err(|e| format!("failed to build email: {e}"));
    }

    let mut multipart = MultiPart::mixed().singlepart(
        SinglePart::builder()
            .header(lettre::message::header::ContentType::TEXT_PLAIN)
            .body(msg.body.clone()),
    );
    for attachment in &msg.attachments {
        let content_type = lettre::message::header::ContentType::parse(&attachment.content_type)
            .map_err(|e| format!("invalid attachment content type: {e}"))?;
        multipart = multipart.singlepart(
            LettreAttachment::new(attachment.filename.clone())
                .body(attachment.bytes.clone(), content_type),
        );
    }

    builder
        .multipart(multipart)
        .map_err(|e| format!("failed to build email: {e}"))
}

fn build_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, ProviderError> {
    let builder = if config.tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| ProviderError::Configuration(format!("SMTP TLS relay error: {e}")))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
    };

    let builder = builder.port(config.smtp_port);

    let builder = if config.username.is_empty() {
        builder
    } else {
        builder.credentials(Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_owned(),
        ))
    };

    Ok(builder.build())
}

/// Classify a lettre SMTP error as permanent (won't succeed on retry, e.g.
/// a rejected recipient) or transient (connection reset, greeting timeout).
fn map_smtp_error(error: &lettre::transport::smtp::Error) -> EmailSendError {
    let message = error.to_string();
    if error.is_permanent() {
        EmailSendError::Permanent(message)
    } else {
        EmailSendError::Transient(message)
    }
}
