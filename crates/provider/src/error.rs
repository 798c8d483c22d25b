use thiserror::Error;

/// Transport/adapter-level failure. Distinct from [`crate::Outcome`]: an
/// `Outcome::TransientFailure`/`PermanentFailure` is a *classified* delivery
/// result that still produces a row update, while `ProviderError` is raised
/// when the adapter cannot even classify the attempt (bad configuration,
/// connection refused before any HTTP response, serialization failure).
/// The dispatcher (C5) treats any `Err` here as a transient outcome.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid provider configuration: {0}")]
    Configuration(String),

    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProviderError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_and_timeout_are_retryable() {
        assert!(ProviderError::Connection("reset".into()).is_retryable());
        assert!(ProviderError::Timeout(std::time::Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn configuration_is_not_retryable() {
        assert!(!ProviderError::Configuration("missing host".into()).is_retryable());
    }
}
