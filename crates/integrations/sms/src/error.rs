use thiserror::Error;

/// Internal Twilio-specific error, classified into the adapter's
/// transient/permanent split before crossing into [`pinguin_provider::Outcome`].
#[derive(Debug, Error)]
pub enum TwilioError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Twilio API returned a non-2xx response or an `error_code` in a
    /// 2xx body. `status` is the HTTP status when available.
    #[error("Twilio API error ({status:?}): {message}")]
    Api { status: Option<u16>, message: String },

    #[error("rate limited by Twilio")]
    RateLimited,
}

impl TwilioError {
    /// A 5xx status, a connection-level failure, or a 429 is worth retrying;
    /// anything else (bad credentials, invalid number, 4xx validation) is not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited => true,
            Self::Api { status, .. } => status.is_none_or(|s| s >= 500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_retryable() {
        assert!(TwilioError::RateLimited.is_retryable());
    }

    #[test]
    fn server_error_is_retryable() {
        assert!(
            TwilioError::Api {
                status: Some(503),
                message: "unavailable".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn client_error_is_not_retryable() {
        assert!(
            !TwilioError::Api {
                status: Some(400),
                message: "invalid_auth".into()
            }
            .is_retryable()
        );
    }
}
