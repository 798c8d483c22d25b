use sqlx::SqlitePool;

/// Creates every table named in the persisted-state section, idempotently.
/// Run once at boot before the crash-recovery reset and the scheduler's
/// first tick.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            enabled INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tenant_domains (
            host TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tenant_members (
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            email TEXT NOT NULL,
            role TEXT NOT NULL,
            PRIMARY KEY (tenant_id, email)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tenant_identities (
            tenant_id TEXT PRIMARY KEY REFERENCES tenants(id),
            google_client_id TEXT,
            tauth_base_url TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS email_profiles (
            tenant_id TEXT PRIMARY KEY REFERENCES tenants(id),
            host TEXT NOT NULL,
            port INTEGER NOT NULL,
            username TEXT NOT NULL,
            encrypted_password TEXT NOT NULL,
            from_address TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sms_profiles (
            tenant_id TEXT PRIMARY KEY REFERENCES tenants(id),
            account_sid TEXT NOT NULL,
            encrypted_auth_token TEXT NOT NULL,
            from_number TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS notifications (
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            notification_id TEXT NOT NULL,
            type TEXT NOT NULL,
            recipient TEXT NOT NULL,
            subject TEXT,
            message TEXT NOT NULL,
            attachments TEXT NOT NULL,
            status TEXT NOT NULL,
            provider_message_id TEXT,
            retry_count INTEGER NOT NULL,
            scheduled_time TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (tenant_id, notification_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS notifications_status_scheduled_idx ON notifications (status, scheduled_time)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS notifications_tenant_created_idx ON notifications (tenant_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
