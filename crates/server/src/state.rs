use std::sync::Arc;
use std::time::Duration;

use pinguin_dispatcher::Dispatcher;
use pinguin_store::{NotificationStore, TenantStore};
use secrecy::SecretString;

/// Shared application state passed to every RPC/HTTP handler, grounded on
/// the teacher's `AppState` composition pattern.
#[derive(Clone)]
pub struct AppState {
    pub tenant_store: Arc<TenantStore>,
    pub notification_store: Arc<NotificationStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub grpc_auth_token: SecretString,
    pub tauth_signing_key: SecretString,
    pub limits: Arc<Limits>,
}

/// Request-validation limits from the `limits` config section, held
/// separately from the other config sections so handlers can depend on just
/// this without pulling in secrets.
#[derive(Debug, Clone)]
pub struct Limits {
    pub operation_timeout: Duration,
    pub max_payload_bytes: usize,
    pub max_page_size: i64,
    /// Caps the raw request body axum will buffer, enforced via
    /// `DefaultBodyLimit` on both routers -- distinct from
    /// `max_payload_bytes`, which caps decoded attachment bytes.
    pub max_message_size_bytes: usize,
}
