use pinguin_core::{PinguinError, TenantId};
use pinguin_store::TenantStore;

use super::identity::CallerIdentity;

/// The shared precedence algorithm from spec.md §4.7, used by both the
/// RPC-JSON middleware (after the bearer-token check) and the HTTP/UI
/// cookie middleware. `caller_email` is the identity asserted by whichever
/// surface authenticated the request (an `x-caller-email` header for RPC, a
/// TAuth JWT's claim for the HTTP/UI surface) — this function never
/// authenticates on its own, only resolves and authorizes.
pub async fn resolve_tenant(
    tenant_store: &TenantStore,
    caller_email: &str,
    explicit_tenant_id: Option<&str>,
    host: &str,
) -> Result<CallerIdentity, PinguinError> {
    if let Some(explicit) = explicit_tenant_id {
        return resolve_explicit_override(tenant_store, caller_email, explicit).await;
    }

    match tenant_store.resolve_by_host(host).await {
        Ok(tenant_id) => {
            let tenant = tenant_store.resolve_by_id(&tenant_id).await.map_err(|_| PinguinError::not_found("tenant not found"))?;
            if !tenant.enabled {
                return Err(PinguinError::not_found("tenant disabled"));
            }
            if let Some(role) = tenant.role_of(caller_email) {
                return Ok(CallerIdentity {
                    tenant_id,
                    email: caller_email.to_owned(),
                    role,
                });
            }
            resolve_by_admin_membership(tenant_store, caller_email).await
        }
        Err(_) => resolve_by_admin_membership(tenant_store, caller_email).await,
    }
}

async fn resolve_explicit_override(tenant_store: &TenantStore, caller_email: &str, explicit_tenant_id: &str) -> Result<CallerIdentity, PinguinError> {
    let (_, global_role) = tenant_store
        .find_tenant_for_admin(caller_email)
        .await
        .map_err(|_| PinguinError::permission_denied("caller is not a superadmin of any tenant"))?;
    if global_role != pinguin_core::Role::SuperAdmin {
        return Err(PinguinError::permission_denied("x-tenant-id override requires a superadmin caller"));
    }

    let tenant_id: TenantId = explicit_tenant_id.into();
    let tenant = tenant_store.resolve_by_id(&tenant_id).await.map_err(|_| PinguinError::not_found("tenant not found"))?;
    if !tenant.enabled {
        return Err(PinguinError::not_found("tenant disabled"));
    }

    Ok(CallerIdentity {
        tenant_id,
        email: caller_email.to_owned(),
        role: pinguin_core::Role::SuperAdmin,
    })
}

async fn resolve_by_admin_membership(tenant_store: &TenantStore, caller_email: &str) -> Result<CallerIdentity, PinguinError> {
    let (tenant_id, role) = tenant_store
        .find_tenant_for_admin(caller_email)
        .await
        .map_err(|_| PinguinError::permission_denied("caller is not an admin of any tenant"))?;

    Ok(CallerIdentity {
        tenant_id,
        email: caller_email.to_owned(),
        role,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pinguin_core::{Role, Tenant, TenantAdmin};
    use pinguin_crypto::parse_master_key;
    use pinguin_store::run_migrations;
    use sqlx::SqlitePool;

    use super::*;

    async fn store_with(tenants: Vec<Tenant>) -> TenantStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = TenantStore::new(pool, parse_master_key(&"ab".repeat(32)).unwrap());
        store.reconcile(&tenants).await.unwrap();
        store
    }

    fn tenant(id: &str, domain: &str, admin_email: &str, role: Role) -> Tenant {
        Tenant::new(
            id.into(),
            true,
            BTreeSet::from([domain.to_owned()]),
            vec![TenantAdmin {
                email: admin_email.into(),
                role,
            }],
            None,
            None,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn host_match_resolves_tenant() {
        let store = store_with(vec![tenant("acme", "acme.test", "owner@acme.test", Role::Admin)]).await;
        let identity = resolve_tenant(&store, "owner@acme.test", None, "acme.test").await.unwrap();
        assert_eq!(identity.tenant_id, "acme".into());
        assert_eq!(identity.role, Role::Admin);
    }

    #[tokio::test]
    async fn falls_back_to_admin_membership_when_host_unmapped() {
        let store = store_with(vec![tenant("acme", "acme.test", "owner@acme.test", Role::Admin)]).await;
        let identity = resolve_tenant(&store, "owner@acme.test", None, "unmapped.test").await.unwrap();
        assert_eq!(identity.tenant_id, "acme".into());
    }

    #[tokio::test]
    async fn unresolvable_caller_is_permission_denied() {
        let store = store_with(vec![tenant("acme", "acme.test", "owner@acme.test", Role::Admin)]).await;
        let err = resolve_tenant(&store, "nobody@acme.test", None, "unmapped.test").await.unwrap_err();
        assert_eq!(err.kind, pinguin_core::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn explicit_override_requires_superadmin() {
        let store = store_with(vec![
            tenant("acme", "acme.test", "owner@acme.test", Role::Admin),
            tenant("globex", "globex.test", "root@globex.test", Role::SuperAdmin),
        ])
        .await;

        let err = resolve_tenant(&store, "owner@acme.test", Some("globex"), "acme.test").await.unwrap_err();
        assert_eq!(err.kind, pinguin_core::ErrorKind::PermissionDenied);

        let identity = resolve_tenant(&store, "root@globex.test", Some("acme"), "globex.test").await.unwrap();
        assert_eq!(identity.tenant_id, "acme".into());
        assert_eq!(identity.role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn disabled_tenant_is_not_found() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = TenantStore::new(pool, parse_master_key(&"ab".repeat(32)).unwrap());
        let disabled = Tenant::new(
            "acme".into(),
            false,
            BTreeSet::from(["acme.test".to_owned()]),
            vec![TenantAdmin {
                email: "owner@acme.test".into(),
                role: Role::Admin,
            }],
            None,
            None,
            None,
        )
        .unwrap();
        store.reconcile(&[disabled]).await.unwrap();

        let err = resolve_tenant(&store, "owner@acme.test", None, "acme.test").await.unwrap_err();
        assert_eq!(err.kind, pinguin_core::ErrorKind::NotFound);
    }
}
