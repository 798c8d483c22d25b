use std::collections::BTreeSet;

use pinguin_core::{EmailProfile, PinguinError, Role, SmsProfile, Tenant, TenantAdmin, TenantIdentity};
use pinguin_crypto::{MasterKey, encrypt_value, is_encrypted};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TenantAdminConfig {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct TenantIdentityConfig {
    pub google_client_id: Option<String>,
    pub tauth_base_url: Option<String>,
}

/// The SMTP secret may be given as plaintext or as an `ENC[...]` envelope
/// already produced by the `encrypt` CLI subcommand; either is accepted and
/// normalized to an envelope at load time.
#[derive(Debug, Deserialize)]
pub struct EmailProfileConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

#[derive(Debug, Deserialize)]
pub struct SmsProfileConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
}

/// The declarative shape of a single entry in the `tenants` list (§6).
#[derive(Debug, Deserialize)]
pub struct TenantConfig {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub domains: Vec<String>,
    pub admins: Vec<TenantAdminConfig>,
    pub identity: Option<TenantIdentityConfig>,
    pub email_profile: Option<EmailProfileConfig>,
    pub sms_profile: Option<SmsProfileConfig>,
}

fn default_enabled() -> bool {
    true
}

/// Normalizes a config-supplied secret to an `ENC[...]` envelope: passes
/// already-encrypted values through, encrypts plaintext ones with the
/// server's master key. Mirrors the teacher's `require_decrypt` pattern in
/// reverse — here the config is the source of plaintext, not the sink.
fn normalize_secret(secret: &SecretString, master_key: &MasterKey) -> Result<String, PinguinError> {
    let exposed = secret.expose_secret();
    if is_encrypted(exposed) {
        Ok(exposed.to_owned())
    } else {
        encrypt_value(exposed, master_key).map_err(|e| PinguinError::internal(format!("failed to encrypt tenant secret: {e}")))
    }
}

impl TenantConfig {
    pub fn into_tenant(self, master_key: &MasterKey) -> Result<Tenant, PinguinError> {
        let admins = self
            .admins
            .into_iter()
            .map(|a| {
                let role = match a.role.to_lowercase().as_str() {
                    "superadmin" => Role::SuperAdmin,
                    _ => Role::Admin,
                };
                TenantAdmin { email: a.email, role }
            })
            .collect();

        let identity = self.identity.map(|i| TenantIdentity {
            google_client_id: i.google_client_id,
            tauth_base_url: i.tauth_base_url,
        });

        let email_profile = self
            .email_profile
            .map(|p| {
                Ok::<_, PinguinError>(EmailProfile {
                    host: p.host,
                    port: p.port,
                    username: p.username,
                    encrypted_password: normalize_secret(&p.password, master_key)?,
                    from_address: p.from_address,
                })
            })
            .transpose()?;

        let sms_profile = self
            .sms_profile
            .map(|p| {
                Ok::<_, PinguinError>(SmsProfile {
                    account_sid: p.account_sid,
                    encrypted_auth_token: normalize_secret(&p.auth_token, master_key)?,
                    from_number: p.from_number,
                })
            })
            .transpose()?;

        Tenant::new(
            self.id.into(),
            self.enabled,
            self.domains.into_iter().collect::<BTreeSet<_>>(),
            admins,
            identity,
            email_profile,
            sms_profile,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinguin_crypto::parse_master_key;

    #[test]
    fn plaintext_secret_is_encrypted_on_load() {
        let key = parse_master_key(&"ab".repeat(32)).unwrap();
        let config = TenantConfig {
            id: "acme".into(),
            enabled: true,
            domains: vec!["acme.test".into()],
            admins: vec![TenantAdminConfig {
                email: "owner@acme.test".into(),
                role: "admin".into(),
            }],
            identity: None,
            email_profile: Some(EmailProfileConfig {
                host: "smtp.acme.test".into(),
                port: 587,
                username: "bot".into(),
                password: SecretString::from("hunter2".to_owned()),
                from_address: "bot@acme.test".into(),
            }),
            sms_profile: None,
        };

        let tenant = config.into_tenant(&key).unwrap();
        let encrypted = tenant.email_profile.unwrap().encrypted_password;
        assert!(is_encrypted(&encrypted));
    }

    #[test]
    fn already_encrypted_secret_passes_through_unchanged() {
        let key = parse_master_key(&"ab".repeat(32)).unwrap();
        let envelope = encrypt_value("hunter2", &key).unwrap();
        let config = TenantConfig {
            id: "acme".into(),
            enabled: true,
            domains: vec!["acme.test".into()],
            admins: vec![TenantAdminConfig {
                email: "owner@acme.test".into(),
                role: "superadmin".into(),
            }],
            identity: None,
            email_profile: Some(EmailProfileConfig {
                host: "smtp.acme.test".into(),
                port: 587,
                username: "bot".into(),
                password: SecretString::from(envelope.clone()),
                from_address: "bot@acme.test".into(),
            }),
            sms_profile: None,
        };

        let tenant = config.into_tenant(&key).unwrap();
        assert_eq!(tenant.email_profile.unwrap().encrypted_password, envelope);
        assert_eq!(tenant.admins[0].role, Role::SuperAdmin);
    }
}
