use async_trait::async_trait;
use pinguin_core::Notification;

use crate::error::ProviderError;
use crate::outcome::Outcome;

/// Strongly-typed provider trait with native `async fn`.
///
/// Not object-safe because it uses native `async fn` methods (which desugar
/// to opaque `impl Future` return types). For dynamic dispatch use
/// [`DynProvider`] instead -- every `Provider` automatically implements
/// `DynProvider` via the blanket implementation below.
pub trait Provider: Send + Sync {
    /// Returns the adapter's name (`"smtp"`, `"sms"`), used in log fields.
    fn name(&self) -> &str;

    /// Attempt delivery of a single notification, returning a classified
    /// [`Outcome`]. Construction of the adapter already carries the
    /// per-tenant, decrypted credentials from `TenantRuntime`.
    fn execute(
        &self,
        notification: &Notification,
    ) -> impl std::future::Future<Output = Result<Outcome, ProviderError>> + Send;

    /// Verify the adapter can reach its downstream without sending anything.
    fn health_check(&self) -> impl std::future::Future<Output = Result<(), ProviderError>> + Send;
}

/// Object-safe provider trait for use behind `Arc<dyn DynProvider>`, as held
/// by the dispatcher (C5) once the adapter for a notification's `type` has
/// been selected.
#[async_trait]
pub trait DynProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, notification: &Notification) -> Result<Outcome, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Blanket implementation: any type that implements [`Provider`] also
/// implements [`DynProvider`], bridging the static and dynamic dispatch
/// worlds without every adapter needing its own `#[async_trait]` impl.
#[async_trait]
impl<T: Provider + Sync> DynProvider for T {
    fn name(&self) -> &str {
        Provider::name(self)
    }

    async fn execute(&self, notification: &Notification) -> Result<Outcome, ProviderError> {
        Provider::execute(self, notification).await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Provider::health_check(self).await
    }
}
