use secrecy::SecretString;
use serde::Serialize;

/// SMTP transport settings for a single tenant's `emailProfile`, built from
/// the decrypted [`pinguin_core::EmailProfile`] held in `TenantRuntime`.
#[derive(Clone, Serialize)]
pub struct SmtpConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    #[serde(skip)]
    pub password: SecretString,
    pub from_address: String,
    /// STARTTLS is used whenever the port isn't the plaintext-relay
    /// default (25); tenants pinned to 25 get a dangerous/no-TLS transport,
    /// matching the teacher's `tls` toggle.
    pub tls: bool,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("tls", &self.tls)
            .finish()
    }
}

impl SmtpConfig {
    #[must_use]
    pub fn new(
        smtp_host: impl Into<String>,
        smtp_port: u16,
        username: impl Into<String>,
        password: SecretString,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            smtp_host: smtp_host.into(),
            smtp_port,
            username: username.into(),
            password,
            from_address: from_address.into(),
            tls: smtp_port != 25,
        }
    }

    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let config = SmtpConfig::new(
            "smtp.example.com",
            587,
            "user",
            SecretString::from("super-secret".to_owned()),
            "noreply@example.com",
        );
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn port_25_defaults_to_no_tls() {
        let config = SmtpConfig::new(
            "relay.example.com",
            25,
            "",
            SecretString::from(String::new()),
            "noreply@example.com",
        );
        assert!(!config.tls);
    }
}
