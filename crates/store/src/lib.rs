//! SQLite-backed persistence for tenants and notifications, with the
//! in-memory tenant runtime cache sitting in front of the tenant tables.

pub mod error;
pub mod migrations;
pub mod notification_store;
pub mod tenant_cache;
pub mod tenant_store;

pub use error::StoreError;
pub use migrations::run_migrations;
pub use notification_store::NotificationStore;
pub use tenant_cache::{EmailRuntime, SmsRuntime, TenantCache, TenantRuntime};
pub use tenant_store::TenantStore;
