use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{PinguinError, Result};
use crate::types::TenantId;

/// Admin scope for a tenant member. Only `SuperAdmin` may pass an explicit
/// `x-tenant-id` override at the resolver (spec's Open Question on the
/// source's sparsely-specified "global view" scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAdmin {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantIdentity {
    pub google_client_id: Option<String>,
    pub tauth_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailProfile {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// `ENC[...]` envelope as read from config/store; decrypted lazily into
    /// `TenantRuntime` by the cache, never held plaintext here.
    pub encrypted_password: String,
    pub from_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsProfile {
    pub account_sid: String,
    pub encrypted_auth_token: String,
    pub from_number: String,
}

/// A tenant as held in the store. Constructed only through [`Tenant::new`],
/// which enforces the data model's invariants: non-empty domain entries,
/// at least one admin, a non-blank id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub enabled: bool,
    pub domains: BTreeSet<String>,
    pub admins: Vec<TenantAdmin>,
    pub identity: Option<TenantIdentity>,
    pub email_profile: Option<EmailProfile>,
    pub sms_profile: Option<SmsProfile>,
}

impl Tenant {
    /// Rejects an empty/whitespace id, blank domains, and an empty admin
    /// list — a tenant with nobody able to administer it is unreachable
    /// through every surface that requires an admin caller.
    pub fn new(
        id: TenantId,
        enabled: bool,
        domains: BTreeSet<String>,
        admins: Vec<TenantAdmin>,
        identity: Option<TenantIdentity>,
        email_profile: Option<EmailProfile>,
        sms_profile: Option<SmsProfile>,
    ) -> Result<Self> {
        if id.as_str().trim().is_empty() {
            return Err(PinguinError::invalid_argument("tenant id must not be blank"));
        }
        if domains.iter().any(|d| d.trim().is_empty()) {
            return Err(PinguinError::invalid_argument("tenant domain must not be blank"));
        }
        if admins.is_empty() {
            return Err(PinguinError::invalid_argument(
                "tenant must have at least one admin",
            ));
        }
        Ok(Self {
            id,
            enabled,
            domains,
            admins,
            identity,
            email_profile,
            sms_profile,
        })
    }

    #[must_use]
    pub fn is_admin(&self, email: &str) -> bool {
        self.admins.iter().any(|a| a.email.eq_ignore_ascii_case(email))
    }

    #[must_use]
    pub fn role_of(&self, email: &str) -> Option<Role> {
        self.admins
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .map(|a| a.role)
    }
}

/// Case-insensitive host match, stripping a trailing `:port` the same way
/// the resolver strips it before lookup.
#[must_use]
pub fn normalize_host(host: &str) -> String {
    host.split(':').next().unwrap_or(host).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admins() -> Vec<TenantAdmin> {
        vec![TenantAdmin {
            email: "owner@acme.test".into(),
            role: Role::Admin,
        }]
    }

    #[test]
    fn rejects_blank_id() {
        let err = Tenant::new(
            "   ".into(),
            true,
            BTreeSet::new(),
            admins(),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn rejects_no_admins() {
        let err = Tenant::new("acme".into(), true, BTreeSet::new(), vec![], None, None, None)
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn is_admin_is_case_insensitive() {
        let tenant = Tenant::new("acme".into(), true, BTreeSet::new(), admins(), None, None, None)
            .unwrap();
        assert!(tenant.is_admin("OWNER@ACME.test"));
        assert!(!tenant.is_admin("nobody@acme.test"));
    }

    #[test]
    fn host_normalization_strips_port_and_case() {
        assert_eq!(normalize_host("Acme.Example.com:8443"), "acme.example.com");
    }
}
