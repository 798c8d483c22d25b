//! Single-attempt dispatch: resolve the tenant runtime, select an adapter,
//! send, and translate the outcome into a status transition (spec §4.5).
//!
//! The dispatcher never retries internally — steps 1-4 (runtime lookup,
//! adapter selection, send, translation) happen outside any transaction,
//! and step 5 (persisting the new status) is the only atomic operation,
//! a single `UPDATE ... WHERE status = expected` CAS. Retrying a
//! transiently-failed notification is the scheduler's job (`pinguin-scheduler`),
//! which re-selects `ERRORED` rows after their backoff window elapses.

pub mod error;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pinguin_core::{Notification, NotificationType, Status, TenantId};
use pinguin_email::{EmailAdapter, SmtpConfig};
use pinguin_provider::{Outcome, Provider};
use pinguin_sms::{TwilioConfig, TwilioProvider};
use pinguin_store::{NotificationStore, TenantRuntime, TenantStore};
use tracing::{instrument, warn};

pub use error::DispatchError;

/// Per-tenant provider reachability (supplemented: SPEC_FULL.md's health
/// surface). `None` means the tenant has no profile of that kind configured;
/// `Some(false)` means a profile exists but its `health_check` failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub email: Option<bool>,
    pub sms: Option<bool>,
}

impl ProviderHealth {
    /// A tenant is considered reachable if every configured profile passed
    /// its health check. A tenant with no profiles at all is reachable
    /// vacuously.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.email.unwrap_or(true) && self.sms.unwrap_or(true)
    }
}

/// The dispatch engine (C5). Holds no per-tenant state; every call loads a
/// fresh `TenantRuntime` (cached by `TenantStore`) and constructs adapters
/// from scratch so credentials never cross a tenant or call boundary.
pub struct Dispatcher {
    tenant_store: Arc<TenantStore>,
    notification_store: Arc<NotificationStore>,
    operation_timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        tenant_store: Arc<TenantStore>,
        notification_store: Arc<NotificationStore>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            tenant_store,
            notification_store,
            operation_timeout,
        }
    }

    /// Dispatches a single notification. `notification.status` is used as
    /// the CAS `expected` value when persisting the outcome, so callers
    /// driving an inline send (still `QUEUED`) and the scheduler driving a
    /// leased retry (`INFLIGHT`) share the same code path.
    #[instrument(skip(self, notification), fields(tenant_id = %notification.tenant_id, notification_id = %notification.notification_id))]
    pub async fn dispatch(&self, notification: &Notification) -> Result<Notification, DispatchError> {
        let expected = notification.status;
        let runtime = self.tenant_store.runtime_for(&notification.tenant_id).await?;

        let outcome = if runtime.enabled {
            match notification.kind {
                NotificationType::Email => self.dispatch_email(&runtime, notification).await,
                NotificationType::Sms => self.dispatch_sms(&runtime, notification).await,
            }
        } else {
            Outcome::PermanentFailure {
                reason: "tenant_disabled".to_owned(),
            }
        };

        self.persist_outcome(notification, expected, outcome).await
    }

    async fn dispatch_email(&self, runtime: &TenantRuntime, notification: &Notification) -> Outcome {
        let Some(email) = &runtime.email else {
            return Outcome::PermanentFailure {
                reason: "no_profile".to_owned(),
            };
        };
        let config = SmtpConfig::new(
            email.host.clone(),
            email.port,
            email.username.clone(),
            email.password.clone(),
            email.from_address.clone(),
        );
        match EmailAdapter::new(config) {
            Ok(adapter) => self.execute_with_timeout(&adapter, notification).await,
            Err(err) => Outcome::TransientFailure { reason: err.to_string() },
        }
    }

    async fn dispatch_sms(&self, runtime: &TenantRuntime, notification: &Notification) -> Outcome {
        let Some(sms) = &runtime.sms else {
            return Outcome::PermanentFailure {
                reason: "no_profile".to_owned(),
            };
        };
        let config = TwilioConfig::new(sms.account_sid.clone(), sms.auth_token.clone(), sms.from_number.clone());
        let adapter = TwilioProvider::new(config);
        self.execute_with_timeout(&adapter, notification).await
    }

    /// Exercises `health_check()` on every provider configured for
    /// `tenant_id`, without dispatching anything. Used by the `/api/health`
    /// readiness surface to report real per-tenant reachability instead of
    /// just the tenant's `enabled` flag.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn check_health(&self, tenant_id: &TenantId) -> Result<ProviderHealth, DispatchError> {
        let runtime = self.tenant_store.runtime_for(tenant_id).await?;

        let email = match &runtime.email {
            Some(email) => {
                let config = SmtpConfig::new(
                    email.host.clone(),
                    email.port,
                    email.username.clone(),
                    email.password.clone(),
                    email.from_address.clone(),
                );
                Some(match EmailAdapter::new(config) {
                    Ok(adapter) => adapter.health_check().await.is_ok(),
                    Err(err) => {
                        warn!(error = %err, "email adapter construction failed during health check");
                        false
                    }
                })
            }
            None => None,
        };

        let sms = match &runtime.sms {
            Some(sms) => {
                let config = TwilioConfig::new(sms.account_sid.clone(), sms.auth_token.clone(), sms.from_number.clone());
                let adapter = TwilioProvider::new(config);
                Some(adapter.health_check().await.is_ok())
            }
            None => None,
        };

        Ok(ProviderHealth { email, sms })
    }

    async fn execute_with_timeout<P: Provider>(&self, adapter: &P, notification: &Notification) -> Outcome {
        match tokio::time::timeout(self.operation_timeout, adapter.execute(notification)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => Outcome::TransientFailure { reason: err.to_string() },
            Err(_) => Outcome::TransientFailure {
                reason: format!("operation timed out after {:?}", self.operation_timeout),
            },
        }
    }

    /// Translates the classified `Outcome` into a status transition
    /// (step 4) and persists it via the single CAS `UpdateStatus` call
    /// (step 5). A CAS miss means another worker already moved the row
    /// (e.g. a concurrent `Cancel`); the caller sees `LeaseLost`, never a
    /// silently overwritten `CANCELLED` row.
    async fn persist_outcome(
        &self,
        notification: &Notification,
        expected: Status,
        outcome: Outcome,
    ) -> Result<Notification, DispatchError> {
        let now = Utc::now();
        let (new_status, provider_message_id, retry_count) = match &outcome {
            Outcome::Delivered { provider_message_id } => {
                (Status::Sent, Some(provider_message_id.clone()), notification.retry_count)
            }
            Outcome::TransientFailure { reason } => {
                warn!(reason, "transient dispatch failure");
                (Status::Errored, notification.provider_message_id.clone(), notification.retry_count + 1)
            }
            Outcome::PermanentFailure { reason } => {
                warn!(reason, "permanent dispatch failure");
                (Status::Failed, notification.provider_message_id.clone(), notification.retry_count + 1)
            }
        };

        let updated = self
            .notification_store
            .update_status(
                &notification.tenant_id,
                &notification.notification_id,
                expected,
                new_status,
                provider_message_id.clone(),
                retry_count,
                now,
            )
            .await?;

        if !updated {
            return Err(DispatchError::LeaseLost);
        }

        Ok(Notification {
            status: new_status,
            provider_message_id,
            retry_count,
            updated_at: now,
            ..notification.clone()
        })
    }
}
