use std::collections::HashMap;

use pinguin_core::TenantId;
use secrecy::SecretString;
use tokio::sync::RwLock;

/// Decrypted SMTP credentials for a tenant's `emailProfile`.
#[derive(Debug, Clone)]
pub struct EmailRuntime {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

/// Decrypted Twilio-compatible credentials for a tenant's `smsProfile`.
#[derive(Debug, Clone)]
pub struct SmsRuntime {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
}

/// The decrypted, cache-resident snapshot handed to the dispatcher. Always
/// returned as an owned clone so callers can't mutate cache state.
#[derive(Debug, Clone)]
pub struct TenantRuntime {
    pub tenant_id: TenantId,
    pub enabled: bool,
    pub email: Option<EmailRuntime>,
    pub sms: Option<SmsRuntime>,
}

#[derive(Default)]
struct CacheInner {
    host_to_tenant: HashMap<String, TenantId>,
    runtime: HashMap<TenantId, TenantRuntime>,
}

/// Two in-memory maps guarded by a single `RwLock`: `host -> tenant_id` and
/// `tenant_id -> TenantRuntime`. Readers are wait-free after
/// the first populate; writers (population, invalidation) briefly hold the
/// write half.
#[derive(Default)]
pub struct TenantCache {
    inner: RwLock<CacheInner>,
}

impl TenantCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn host_to_tenant(&self, host: &str) -> Option<TenantId> {
        self.inner.read().await.host_to_tenant.get(host).cloned()
    }

    pub async fn runtime(&self, tenant_id: &TenantId) -> Option<TenantRuntime> {
        self.inner.read().await.runtime.get(tenant_id).cloned()
    }

    pub async fn populate_host(&self, host: String, tenant_id: TenantId) {
        self.inner.write().await.host_to_tenant.insert(host, tenant_id);
    }

    pub async fn populate_runtime(&self, runtime: TenantRuntime) {
        self.inner.write().await.runtime.insert(runtime.tenant_id.clone(), runtime);
    }

    /// Drops both host and runtime entries for the tenant. Called on any
    /// tenant write and on crypto-key rotation.
    pub async fn invalidate(&self, tenant_id: &TenantId) {
        let mut inner = self.inner.write().await;
        inner.runtime.remove(tenant_id);
        inner.host_to_tenant.retain(|_, v| v != tenant_id);
    }
}
