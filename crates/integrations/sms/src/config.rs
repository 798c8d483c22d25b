use secrecy::SecretString;

/// Configuration for a tenant's Twilio-compatible SMS provider, built from
/// the decrypted [`pinguin_core::SmsProfile`] held in `TenantRuntime`.
#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
    /// Overridable for tests against a mock server; defaults to the real API.
    pub api_base_url: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl TwilioConfig {
    #[must_use]
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: SecretString,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token,
            from_number: from_number.into(),
            api_base_url: "https://api.twilio.com".to_owned(),
        }
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_api_base_url() {
        let config = TwilioConfig::new("AC123", SecretString::from("token".to_owned()), "+15551234567");
        assert_eq!(config.api_base_url, "https://api.twilio.com");
        assert_eq!(config.account_sid, "AC123");
    }

    #[test]
    fn debug_redacts_auth_token() {
        let config = TwilioConfig::new(
            "AC123",
            SecretString::from("test-placeholder-value".to_owned()),
            "+15551234567",
        );
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("test-placeholder-value"));
        assert!(debug.contains("AC123"));
    }
}
