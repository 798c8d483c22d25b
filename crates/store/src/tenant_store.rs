use std::collections::BTreeSet;

use pinguin_core::{EmailProfile, Role, SmsProfile, Tenant, TenantAdmin, TenantId, TenantIdentity};
use pinguin_crypto::{decrypt_value, MasterKey};
use sqlx::SqlitePool;

use crate::error::StoreError;
use crate::tenant_cache::{EmailRuntime, SmsRuntime, TenantCache, TenantRuntime};

/// Tenant persistence plus the in-memory cache sitting in front of it.
/// Every read tries the cache first; misses fall through to SQLite and
/// repopulate the cache before returning.
pub struct TenantStore {
    pool: SqlitePool,
    master_key: MasterKey,
    cache: TenantCache,
}

impl TenantStore {
    #[must_use]
    pub fn new(pool: SqlitePool, master_key: MasterKey) -> Self {
        Self {
            pool,
            master_key,
            cache: TenantCache::new(),
        }
    }

    /// Replaces the relational tenant tables with the declarative config's
    /// tenant list. Called once at boot, before the server starts accepting
    /// requests — the YAML config is the source of truth for tenant
    /// membership, not an API the operator calls at runtime.
    pub async fn reconcile(&self, tenants: &[Tenant]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tenant_members").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM tenant_domains").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM tenant_identities").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM email_profiles").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM sms_profiles").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM tenants").execute(&mut *tx).await?;

        for tenant in tenants {
            sqlx::query("INSERT INTO tenants (id, enabled) VALUES (?, ?)")
                .bind(tenant.id.as_str())
                .bind(tenant.enabled)
                .execute(&mut *tx)
                .await?;

            for domain in &tenant.domains {
                sqlx::query("INSERT INTO tenant_domains (host, tenant_id) VALUES (?, ?)")
                    .bind(domain)
                    .bind(tenant.id.as_str())
                    .execute(&mut *tx)
                    .await?;
            }

            for admin in &tenant.admins {
                let role = match admin.role {
                    Role::Admin => "admin",
                    Role::SuperAdmin => "superadmin",
                };
                sqlx::query("INSERT INTO tenant_members (tenant_id, email, role) VALUES (?, ?, ?)")
                    .bind(tenant.id.as_str())
                    .bind(&admin.email)
                    .bind(role)
                    .execute(&mut *tx)
                    .await?;
            }

            if let Some(identity) = &tenant.identity {
                sqlx::query(
                    "INSERT INTO tenant_identities (tenant_id, google_client_id, tauth_base_url) VALUES (?, ?, ?)",
                )
                .bind(tenant.id.as_str())
                .bind(&identity.google_client_id)
                .bind(&identity.tauth_base_url)
                .execute(&mut *tx)
                .await?;
            }

            if let Some(profile) = &tenant.email_profile {
                sqlx::query(
                    "INSERT INTO email_profiles (tenant_id, host, port, username, encrypted_password, from_address)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(tenant.id.as_str())
                .bind(&profile.host)
                .bind(i64::from(profile.port))
                .bind(&profile.username)
                .bind(&profile.encrypted_password)
                .bind(&profile.from_address)
                .execute(&mut *tx)
                .await?;
            }

            if let Some(profile) = &tenant.sms_profile {
                sqlx::query(
                    "INSERT INTO sms_profiles (tenant_id, account_sid, encrypted_auth_token, from_number)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(tenant.id.as_str())
                .bind(&profile.account_sid)
                .bind(&profile.encrypted_auth_token)
                .bind(&profile.from_number)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        for tenant in tenants {
            self.cache.invalidate(&tenant.id).await;
        }

        Ok(())
    }

    pub async fn resolve_by_host(&self, host: &str) -> Result<TenantId, StoreError> {
        let host = pinguin_core::normalize_host(host);
        if let Some(tenant_id) = self.cache.host_to_tenant(&host).await {
            return Ok(tenant_id);
        }

        let row: Option<(String,)> = sqlx::query_as("SELECT tenant_id FROM tenant_domains WHERE host = ?")
            .bind(&host)
            .fetch_optional(&self.pool)
            .await?;

        let tenant_id: TenantId = row.ok_or(StoreError::NotFound)?.0.into();
        self.cache.populate_host(host, tenant_id.clone()).await;
        Ok(tenant_id)
    }

    /// Rejects a blank/whitespace id before ever touching SQLite. Kept
    /// distinct from the "no such row" case below so callers (and the RPC
    /// error mapping) can tell a malformed tenant id apart from an unknown
    /// one, even though both currently surface as `StoreError::NotFound`.
    pub async fn resolve_by_id(&self, tenant_id: &TenantId) -> Result<Tenant, StoreError> {
        if tenant_id.as_str().trim().is_empty() {
            return Err(StoreError::InvalidTenantId);
        }

        let row: Option<(bool,)> = sqlx::query_as("SELECT enabled FROM tenants WHERE id = ?")
            .bind(tenant_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        let Some((enabled,)) = row else {
            return Err(StoreError::NotFound);
        };

        let domains: Vec<(String,)> = sqlx::query_as("SELECT host FROM tenant_domains WHERE tenant_id = ?")
            .bind(tenant_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        let domains: BTreeSet<String> = domains.into_iter().map(|(h,)| h).collect();

        let members: Vec<(String, String)> =
            sqlx::query_as("SELECT email, role FROM tenant_members WHERE tenant_id = ?")
                .bind(tenant_id.as_str())
                .fetch_all(&self.pool)
                .await?;
        let admins = members
            .into_iter()
            .map(|(email, role)| TenantAdmin {
                email,
                role: if role == "superadmin" { Role::SuperAdmin } else { Role::Admin },
            })
            .collect();

        let identity: Option<(Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT google_client_id, tauth_base_url FROM tenant_identities WHERE tenant_id = ?",
        )
        .bind(tenant_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let identity = identity.map(|(google_client_id, tauth_base_url)| TenantIdentity {
            google_client_id,
            tauth_base_url,
        });

        let email_profile: Option<(String, i64, String, String, String)> = sqlx::query_as(
            "SELECT host, port, username, encrypted_password, from_address FROM email_profiles WHERE tenant_id = ?",
        )
        .bind(tenant_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let email_profile = email_profile.map(|(host, port, username, encrypted_password, from_address)| EmailProfile {
            host,
            port: port as u16,
            username,
            encrypted_password,
            from_address,
        });

        let sms_profile: Option<(String, String, String)> = sqlx::query_as(
            "SELECT account_sid, encrypted_auth_token, from_number FROM sms_profiles WHERE tenant_id = ?",
        )
        .bind(tenant_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let sms_profile = sms_profile.map(|(account_sid, encrypted_auth_token, from_number)| SmsProfile {
            account_sid,
            encrypted_auth_token,
            from_number,
        });

        Tenant::new(tenant_id.clone(), enabled, domains, admins, identity, email_profile, sms_profile)
            .map_err(|_| StoreError::NotFound)
    }

    /// Returns the decrypted runtime for the tenant, populating the cache on
    /// a miss. Credentials are decrypted fresh from the envelope every time
    /// the cache is repopulated, never persisted plaintext anywhere.
    pub async fn runtime_for(&self, tenant_id: &TenantId) -> Result<TenantRuntime, StoreError> {
        if let Some(runtime) = self.cache.runtime(tenant_id).await {
            return Ok(runtime);
        }

        let tenant = self.resolve_by_id(tenant_id).await?;
        let email = match tenant.email_profile {
            Some(profile) => Some(EmailRuntime {
                host: profile.host,
                port: profile.port,
                username: profile.username,
                password: decrypt_value(&profile.encrypted_password, &self.master_key)?,
                from_address: profile.from_address,
            }),
            None => None,
        };
        let sms = match tenant.sms_profile {
            Some(profile) => Some(SmsRuntime {
                account_sid: profile.account_sid,
                auth_token: decrypt_value(&profile.encrypted_auth_token, &self.master_key)?,
                from_number: profile.from_number,
            }),
            None => None,
        };

        let runtime = TenantRuntime {
            tenant_id: tenant_id.clone(),
            enabled: tenant.enabled,
            email,
            sms,
        };
        self.cache.populate_runtime(runtime.clone()).await;
        Ok(runtime)
    }

    pub async fn invalidate(&self, tenant_id: &TenantId) {
        self.cache.invalidate(tenant_id).await;
    }

    /// Finds the (enabled) tenant that lists `email` as an admin, for the
    /// tenant-resolution precedence rule "caller's verified email matched
    /// against any tenant's admin list". Scans across tenants rather than
    /// through the per-tenant cache — this path is only hit once per
    /// session on the HTTP/UI surface, not per request.
    pub async fn find_tenant_for_admin(&self, email: &str) -> Result<(TenantId, Role), StoreError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT m.tenant_id, m.role
             FROM tenant_members m
             JOIN tenants t ON t.id = m.tenant_id
             WHERE LOWER(m.email) = LOWER(?) AND t.enabled = TRUE
             LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let (tenant_id, role) = row.ok_or(StoreError::NotFound)?;
        let role = if role == "superadmin" { Role::SuperAdmin } else { Role::Admin };
        Ok((tenant_id.into(), role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use pinguin_crypto::{encrypt_value, parse_master_key};

    fn test_key() -> MasterKey {
        parse_master_key(&"ab".repeat(32)).unwrap()
    }

    fn sample_tenant(key: &MasterKey) -> Tenant {
        Tenant::new(
            "acme".into(),
            true,
            BTreeSet::from(["acme.test".to_string()]),
            vec![TenantAdmin {
                email: "owner@acme.test".into(),
                role: Role::Admin,
            }],
            None,
            Some(EmailProfile {
                host: "smtp.acme.test".into(),
                port: 587,
                username: "bot".into(),
                encrypted_password: encrypt_value("hunter2", key).unwrap(),
                from_address: "bot@acme.test".into(),
            }),
            None,
        )
        .unwrap()
    }

    async fn store() -> TenantStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        TenantStore::new(pool, test_key())
    }

    #[tokio::test]
    async fn reconcile_then_resolve_by_host() {
        let store = store().await;
        let key = test_key();
        store.reconcile(&[sample_tenant(&key)]).await.unwrap();

        let tenant_id = store.resolve_by_host("ACME.test:8443").await.unwrap();
        assert_eq!(tenant_id, "acme".into());
    }

    #[tokio::test]
    async fn resolve_by_id_rejects_blank() {
        let store = store().await;
        let err = store.resolve_by_id(&"  ".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTenantId));
    }

    #[tokio::test]
    async fn runtime_for_decrypts_email_password() {
        let store = store().await;
        let key = test_key();
        store.reconcile(&[sample_tenant(&key)]).await.unwrap();

        let runtime = store.runtime_for(&"acme".into()).await.unwrap();
        let email = runtime.email.unwrap();
        use secrecy::ExposeSecret;
        assert_eq!(email.password.expose_secret(), "hunter2");
    }

    #[tokio::test]
    async fn runtime_for_unknown_tenant_not_found() {
        let store = store().await;
        let err = store.runtime_for(&"ghost".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn find_tenant_for_admin_matches_case_insensitively() {
        let store = store().await;
        let key = test_key();
        store.reconcile(&[sample_tenant(&key)]).await.unwrap();

        let (tenant_id, role) = store.find_tenant_for_admin("OWNER@acme.test").await.unwrap();
        assert_eq!(tenant_id, "acme".into());
        assert_eq!(role, Role::Admin);

        let err = store.find_tenant_for_admin("nobody@acme.test").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
