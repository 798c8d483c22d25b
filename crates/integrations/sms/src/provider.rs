use pinguin_core::Notification;
use pinguin_provider::{Outcome, Provider, ProviderError};
use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::{debug, instrument, warn};

use crate::config::TwilioConfig;
use crate::error::TwilioError;
use crate::types::{TwilioApiResponse, TwilioSendMessageRequest};

/// The SMS dispatch adapter (C4), talking to a Twilio-compatible REST API.
/// Constructed fresh per tenant by the dispatcher from that tenant's
/// decrypted `TenantRuntime.sms`.
pub struct TwilioProvider {
    config: TwilioConfig,
    client: Client,
}

impl TwilioProvider {
    pub fn new(config: TwilioConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    /// Create a new Twilio provider with a custom HTTP client (tests, shared
    /// connection pool).
    pub fn with_client(config: TwilioConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base_url, self.config.account_sid
        )
    }

    fn account_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}.json", self.config.api_base_url, self.config.account_sid)
    }

    async fn send_message(&self, request: &TwilioSendMessageRequest) -> Result<TwilioApiResponse, TwilioError> {
        let url = self.messages_url();
        debug!(to = %request.to, "sending SMS via Twilio");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(self.config.auth_token.expose_secret()))
            .form(request)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Twilio API rate limit hit");
            return Err(TwilioError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TwilioError::Api {
                status: Some(status.as_u16()),
                message: format!("HTTP {status}: {body}"),
            });
        }

        let api_response: TwilioApiResponse = response
            .json()
            .await
            .map_err(|e| TwilioError::Api { status: None, message: e.to_string() })?;

        if let Some(code) = api_response.error_code {
            let msg = api_response.error_message.unwrap_or_else(|| format!("error code {code}"));
            return Err(TwilioError::Api { status: Some(status.as_u16()), message: msg });
        }

        Ok(api_response)
    }
}

impl Provider for TwilioProvider {
    fn name(&self) -> &str {
        "sms"
    }

    #[instrument(skip(self, notification), fields(notification_id = %notification.notification_id, provider = "sms"))]
    async fn execute(&self, notification: &Notification) -> Result<Outcome, ProviderError> {
        let request = TwilioSendMessageRequest {
            to: notification.recipient.clone(),
            from: self.config.from_number.clone(),
            body: notification.message.clone(),
        };

        match self.send_message(&request).await {
            Ok(response) => Ok(Outcome::Delivered {
                provider_message_id: response.sid.unwrap_or_else(|| notification.notification_id.to_string()),
            }),
            Err(err) if err.is_retryable() => Ok(Outcome::TransientFailure { reason: err.to_string() }),
            Err(err) => Ok(Outcome::PermanentFailure { reason: err.to_string() }),
        }
    }

    #[instrument(skip(self), fields(provider = "sms"))]
    async fn health_check(&self) -> Result<(), ProviderError> {
        let url = self.account_url();
        debug!("performing Twilio health check via account lookup");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.account_sid, Some(self.config.auth_token.expose_secret()))
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Connection(format!("HTTP {status}: {body}")));
        }

        debug!("Twilio health check passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pinguin_core::{NewNotification, NotificationType};
    use secrecy::SecretString;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    /// A minimal mock HTTP server built on tokio that returns a single canned
    /// response, then closes.
    struct MockTwilioServer {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockTwilioServer {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
            let port = listener.local_addr().unwrap().port();
            let base_url = format!("http://127.0.0.1:{port}");
            Self { listener, base_url }
        }

        async fn respond_once(self, status_code: u16, body: &str) {
            let body = body.to_owned();
            let (mut stream, _) = self.listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status_code} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }

        async fn respond_rate_limited(self) {
            self.respond_once(429, r#"{"error_code":429,"error_message":"rate limited"}"#).await;
        }
    }

    fn sample_notification() -> Notification {
        Notification::create(
            NewNotification {
                tenant_id: "acme".into(),
                kind: NotificationType::Sms,
                recipient: "+15559876543".into(),
                subject: None,
                message: "hello".into(),
                attachments: vec![],
                scheduled_time: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn test_config(base_url: impl Into<String>) -> TwilioConfig {
        TwilioConfig::new("AC123", SecretString::from("token".to_owned()), "+15551234567").with_api_base_url(base_url)
    }

    #[test]
    fn provider_name() {
        let provider = TwilioProvider::new(test_config("http://localhost:1"));
        assert_eq!(Provider::name(&provider), "sms");
    }

    #[tokio::test]
    async fn execute_success() {
        let server = MockTwilioServer::start().await;
        let provider = TwilioProvider::new(test_config(server.base_url.clone()));

        let response_body = r#"{"sid":"SM123","status":"queued","error_code":null,"error_message":null}"#;
        let handle = tokio::spawn(async move {
            server.respond_once(200, response_body).await;
        });

        let outcome = Provider::execute(&provider, &sample_notification()).await.unwrap();
        handle.await.unwrap();

        assert_eq!(outcome, Outcome::Delivered { provider_message_id: "SM123".into() });
    }

    #[tokio::test]
    async fn rate_limited_is_transient() {
        let server = MockTwilioServer::start().await;
        let provider = TwilioProvider::new(test_config(server.base_url.clone()));

        let handle = tokio::spawn(async move {
            server.respond_rate_limited().await;
        });

        let outcome = Provider::execute(&provider, &sample_notification()).await.unwrap();
        handle.await.unwrap();

        assert!(matches!(outcome, Outcome::TransientFailure { .. }));
    }

    #[tokio::test]
    async fn auth_error_is_permanent() {
        let server = MockTwilioServer::start().await;
        let provider = TwilioProvider::new(test_config(server.base_url.clone()));

        let response_body = r#"{"sid":null,"status":null,"error_code":20003,"error_message":"Authentication Error"}"#;
        let handle = tokio::spawn(async move {
            server.respond_once(200, response_body).await;
        });

        let outcome = Provider::execute(&provider, &sample_notification()).await.unwrap();
        handle.await.unwrap();

        assert!(matches!(outcome, Outcome::PermanentFailure { .. }));
    }

    #[tokio::test]
    async fn server_error_is_transient_after_retries() {
        let server = MockTwilioServer::start().await;
        let provider = TwilioProvider::new(test_config(server.base_url.clone()));

        let handle = tokio::spawn(async move {
            server.respond_once(503, "service unavailable").await;
        });

        let outcome = Provider::execute(&provider, &sample_notification()).await.unwrap();
        handle.await.unwrap();

        assert!(matches!(outcome, Outcome::TransientFailure { .. }));
    }

    #[tokio::test]
    async fn health_check_success() {
        let server = MockTwilioServer::start().await;
        let provider = TwilioProvider::new(test_config(server.base_url.clone()));

        let response_body = r#"{"sid":"AC123","friendly_name":"tenant","status":"active"}"#;
        let handle = tokio::spawn(async move {
            server.respond_once(200, response_body).await;
        });

        let result = provider.health_check().await;
        handle.await.unwrap();
        assert!(result.is_ok());
    }
}
