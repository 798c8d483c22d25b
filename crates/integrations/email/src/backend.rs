use async_trait::async_trait;
use pinguin_provider::ProviderError;

use crate::types::EmailMessage;

/// Result of a successful email send operation.
#[derive(Debug, Clone)]
pub struct EmailResult {
    /// Provider-assigned message identifier, if the transport gave one back.
    /// SMTP typically doesn't; callers fall back to a locally generated id.
    pub message_id: Option<String>,
}

/// A classified send failure, mirroring the adapter contract in §4.4/§4.6:
/// permanent failures (bad address, rejected recipient) must not be
/// retried, transient ones (connection reset, 4xx greeting) should be.
#[derive(Debug, thiserror::Error)]
pub enum EmailSendError {
    #[error("permanent: {0}")]
    Permanent(String),
    #[error("transient: {0}")]
    Transient(String),
}

/// Trait for pluggable email delivery backends. Only SMTP is implemented;
/// the trait exists so tests can substitute a fake transport without
/// touching the adapter that classifies outcomes.
#[async_trait]
pub trait EmailBackend: Send + Sync + std::fmt::Debug {
    async fn send(&self, message: &EmailMessage) -> Result<EmailResult, EmailSendError>;

    async fn health_check(&self) -> Result<(), ProviderError>;

    fn backend_name(&self) -> &'static str;
}
