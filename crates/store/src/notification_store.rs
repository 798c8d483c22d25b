use chrono::{DateTime, Utc};
use pinguin_core::{
    Attachment, NewNotification, Notification, NotificationId, NotificationType, Status, TenantId,
};
use sqlx::SqlitePool;

use crate::error::StoreError;

/// Notification persistence. Every multi-step transition is a single
/// `UPDATE ... WHERE status = expected` (CAS), never a long transaction
/// (spec's §5 persistence model).
pub struct NotificationStore {
    pool: SqlitePool,
}

fn status_str(status: Status) -> &'static str {
    match status {
        Status::Queued => "QUEUED",
        Status::Inflight => "INFLIGHT",
        Status::Sent => "SENT",
        Status::Failed => "FAILED",
        Status::Cancelled => "CANCELLED",
        Status::Errored => "ERRORED",
    }
}

fn status_from_str(s: &str) -> Status {
    match s {
        "INFLIGHT" => Status::Inflight,
        "SENT" => Status::Sent,
        "FAILED" => Status::Failed,
        "CANCELLED" => Status::Cancelled,
        "ERRORED" => Status::Errored,
        _ => Status::Queued,
    }
}

fn kind_str(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::Email => "EMAIL",
        NotificationType::Sms => "SMS",
    }
}

fn kind_from_str(s: &str) -> NotificationType {
    if s == "SMS" {
        NotificationType::Sms
    } else {
        NotificationType::Email
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    tenant_id: String,
    notification_id: String,
    #[sqlx(rename = "type")]
    kind: String,
    recipient: String,
    subject: Option<String>,
    message: String,
    attachments: String,
    status: String,
    provider_message_id: Option<String>,
    retry_count: i64,
    scheduled_time: Option<String>,
    created_at: String,
    updated_at: String,
}

fn row_to_notification(row: Row) -> Result<Notification, StoreError> {
    let attachments: Vec<Attachment> = serde_json::from_str(&row.attachments)
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;
    let notification_id = uuid::Uuid::parse_str(&row.notification_id)
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

    Ok(Notification {
        tenant_id: row.tenant_id.into(),
        notification_id: NotificationId::from(notification_id),
        kind: kind_from_str(&row.kind),
        recipient: row.recipient,
        subject: row.subject,
        message: row.message,
        attachments,
        status: status_from_str(&row.status),
        provider_message_id: row.provider_message_id,
        retry_count: row.retry_count as u32,
        scheduled_time: row
            .scheduled_time
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        created_at: DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?
            .with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&row.updated_at)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?
            .with_timezone(&Utc),
    })
}

const SELECT_COLUMNS: &str = "tenant_id, notification_id, type, recipient, subject, message, attachments, \
     status, provider_message_id, retry_count, scheduled_time, created_at, updated_at";

impl NotificationStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewNotification, now: DateTime<Utc>) -> Result<Notification, StoreError> {
        let notification = Notification::create(new, now).map_err(StoreError::Invalid)?;
        self.insert(&notification).await?;
        Ok(notification)
    }

    async fn insert(&self, n: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO notifications
                (tenant_id, notification_id, type, recipient, subject, message, attachments,
                 status, provider_message_id, retry_count, scheduled_time, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(n.tenant_id.as_str())
        .bind(n.notification_id.as_uuid().to_string())
        .bind(kind_str(n.kind))
        .bind(&n.recipient)
        .bind(&n.subject)
        .bind(&n.message)
        .bind(serde_json::to_string(&n.attachments).expect("attachments serialize"))
        .bind(status_str(n.status))
        .bind(&n.provider_message_id)
        .bind(i64::from(n.retry_count))
        .bind(n.scheduled_time.map(|t| t.to_rfc3339()))
        .bind(n.created_at.to_rfc3339())
        .bind(n.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, tenant_id: &TenantId, id: &NotificationId) -> Result<Notification, StoreError> {
        let row: Option<Row> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM notifications WHERE tenant_id = ? AND notification_id = ?"
        ))
        .bind(tenant_id.as_str())
        .bind(id.as_uuid().to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound).and_then(row_to_notification)
    }

    /// Ordered `createdAt DESC`, optionally filtered to a status subset, with
    /// `limit`/`offset` paging. An empty `statuses` means "any status".
    pub async fn list(
        &self,
        tenant_id: &TenantId,
        statuses: &[Status],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows: Vec<Row> = if statuses.is_empty() {
            sqlx::query_as(&format!(
                "SELECT {SELECT_COLUMNS} FROM notifications WHERE tenant_id = ?
                 ORDER BY created_at DESC LIMIT ? OFFSET ?"
            ))
            .bind(tenant_id.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql = format!(
                "SELECT {SELECT_COLUMNS} FROM notifications
                 WHERE tenant_id = ? AND status IN ({placeholders})
                 ORDER BY created_at DESC LIMIT ? OFFSET ?"
            );
            let mut query = sqlx::query_as(&sql).bind(tenant_id.as_str());
            for status in statuses {
                query = query.bind(status_str(*status));
            }
            query.bind(limit).bind(offset).fetch_all(&self.pool).await?
        };
        rows.into_iter().map(row_to_notification).collect()
    }

    /// Atomic `UPDATE ... WHERE status = expected`. Returns `true` if the
    /// CAS succeeded, `false` if another worker already moved the row.
    pub async fn update_status(
        &self,
        tenant_id: &TenantId,
        id: &NotificationId,
        expected: Status,
        new_status: Status,
        provider_message_id: Option<String>,
        retry_count: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications
             SET status = ?, provider_message_id = ?, retry_count = ?, updated_at = ?
             WHERE tenant_id = ? AND notification_id = ? AND status = ?",
        )
        .bind(status_str(new_status))
        .bind(provider_message_id)
        .bind(i64::from(retry_count))
        .bind(updated_at.to_rfc3339())
        .bind(tenant_id.as_str())
        .bind(id.as_uuid().to_string())
        .bind(status_str(expected))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Single indexed query across all tenants: queued rows whose
    /// `scheduledTime <= now` or unset.
    pub async fn select_due_for_dispatch(&self, now: DateTime<Utc>, batch_limit: i64) -> Result<Vec<Notification>, StoreError> {
        let rows: Vec<Row> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM notifications
             WHERE status = 'QUEUED' AND (scheduled_time IS NULL OR scheduled_time <= ?)
             ORDER BY scheduled_time IS NOT NULL, scheduled_time
             LIMIT ?"
        ))
        .bind(now.to_rfc3339())
        .bind(batch_limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_notification).collect()
    }

    /// Candidate `ERRORED` rows not yet past `maxRetries`, oldest-updated
    /// first. This is intentionally *not* filtered by the backoff cutoff in
    /// SQL: `updatedAt + backoff(retryCount) <= now` depends on a per-row
    /// jittered exponential that's cheaper to evaluate once per candidate
    /// in the caller (the scheduler's `backoff` module) than to express as
    /// a query predicate. A row whose cutoff hasn't elapsed yet is simply
    /// skipped by the caller and reconsidered on the next tick.
    pub async fn select_retryable(&self, max_retries: u32, batch_limit: i64) -> Result<Vec<Notification>, StoreError> {
        let rows: Vec<Row> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM notifications
             WHERE status = 'ERRORED' AND retry_count < ?
             ORDER BY updated_at
             LIMIT ?"
        ))
        .bind(i64::from(max_retries))
        .bind(batch_limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_notification).collect()
    }

    /// Non-terminal -> `CANCELLED`; no-op if already `CANCELLED`;
    /// `ErrInvalidState` (via the caller mapping `false`) if any other
    /// terminal status.
    pub async fn cancel(&self, tenant_id: &TenantId, id: &NotificationId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let current = self.get(tenant_id, id).await?;
        if current.status == Status::Cancelled {
            return Ok(());
        }
        if current.status.is_terminal() {
            return Err(StoreError::NotFound);
        }
        let updated = self
            .update_status(
                tenant_id,
                id,
                current.status,
                Status::Cancelled,
                current.provider_message_id,
                current.retry_count,
                now,
            )
            .await?;
        if updated {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    /// Only permitted from `QUEUED`.
    pub async fn reschedule(
        &self,
        tenant_id: &TenantId,
        id: &NotificationId,
        new_scheduled_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET scheduled_time = ?, updated_at = ?
             WHERE tenant_id = ? AND notification_id = ? AND status = 'QUEUED'",
        )
        .bind(new_scheduled_time.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(tenant_id.as_str())
        .bind(id.as_uuid().to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    /// Crash recovery: every `INFLIGHT` row reverts to `QUEUED`,
    /// `retryCount` unchanged. Run once at boot before the scheduler starts.
    pub async fn reset_inflight(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE notifications SET status = 'QUEUED', updated_at = ? WHERE status = 'INFLIGHT'")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    async fn store() -> NotificationStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        NotificationStore::new(pool)
    }

    fn new_email() -> NewNotification {
        NewNotification {
            tenant_id: "acme".into(),
            kind: NotificationType::Email,
            recipient: "user@example.com".into(),
            subject: Some("hi".into()),
            message: "hello".into(),
            attachments: vec![],
            scheduled_time: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_blank_recipient_as_invalid_not_not_found() {
        let store = store().await;
        let mut blank = new_email();
        blank.recipient = "  ".into();

        let err = store.create(blank, Utc::now()).await.unwrap_err();
        match err {
            StoreError::Invalid(inner) => assert_eq!(inner.kind, pinguin_core::ErrorKind::InvalidArgument),
            other => panic!("expected StoreError::Invalid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let store = store().await;
        let now = Utc::now();
        let created = store.create(new_email(), now).await.unwrap();
        let fetched = store.get(&created.tenant_id, &created.notification_id).await.unwrap();
        assert_eq!(fetched.status, Status::Queued);
        assert_eq!(fetched.message, "hello");
    }

    #[tokio::test]
    async fn update_status_cas_fails_on_mismatched_expected() {
        let store = store().await;
        let now = Utc::now();
        let created = store.create(new_email(), now).await.unwrap();

        let ok = store
            .update_status(&created.tenant_id, &created.notification_id, Status::Inflight, Status::Sent, None, 0, now)
            .await
            .unwrap();
        assert!(!ok);

        let ok = store
            .update_status(&created.tenant_id, &created.notification_id, Status::Queued, Status::Inflight, None, 0, now)
            .await
            .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn select_due_for_dispatch_returns_unscheduled_queued_rows() {
        let store = store().await;
        let now = Utc::now();
        store.create(new_email(), now).await.unwrap();

        let due = store.select_due_for_dispatch(now, 10).await.unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn select_due_for_dispatch_excludes_future_scheduled_time() {
        let store = store().await;
        let now = Utc::now();
        let mut future = new_email();
        future.scheduled_time = Some(now + chrono::Duration::hours(1));
        store.create(future, now).await.unwrap();

        let due = store.select_due_for_dispatch(now, 10).await.unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn cancel_non_terminal_succeeds_and_is_idempotent() {
        let store = store().await;
        let now = Utc::now();
        let created = store.create(new_email(), now).await.unwrap();

        store.cancel(&created.tenant_id, &created.notification_id, now).await.unwrap();
        let fetched = store.get(&created.tenant_id, &created.notification_id).await.unwrap();
        assert_eq!(fetched.status, Status::Cancelled);

        store.cancel(&created.tenant_id, &created.notification_id, now).await.unwrap();
    }

    #[tokio::test]
    async fn cancel_terminal_sent_fails() {
        let store = store().await;
        let now = Utc::now();
        let created = store.create(new_email(), now).await.unwrap();
        store
            .update_status(&created.tenant_id, &created.notification_id, Status::Queued, Status::Sent, Some("mid".into()), 0, now)
            .await
            .unwrap();

        let err = store.cancel(&created.tenant_id, &created.notification_id, now).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn reschedule_only_from_queued() {
        let store = store().await;
        let now = Utc::now();
        let created = store.create(new_email(), now).await.unwrap();
        store
            .update_status(&created.tenant_id, &created.notification_id, Status::Queued, Status::Inflight, None, 0, now)
            .await
            .unwrap();

        let err = store
            .reschedule(&created.tenant_id, &created.notification_id, now + chrono::Duration::hours(1), now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn list_filters_by_status_and_pages() {
        let store = store().await;
        let now = Utc::now();
        let a = store.create(new_email(), now).await.unwrap();
        let b = store.create(new_email(), now + chrono::Duration::seconds(1)).await.unwrap();
        store
            .update_status(&b.tenant_id, &b.notification_id, Status::Queued, Status::Sent, Some("mid".into()), 0, now)
            .await
            .unwrap();

        let all = store.list(&a.tenant_id, &[], 10, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].notification_id, b.notification_id, "ordered createdAt DESC");

        let sent_only = store.list(&a.tenant_id, &[Status::Sent], 10, 0).await.unwrap();
        assert_eq!(sent_only.len(), 1);
        assert_eq!(sent_only[0].notification_id, b.notification_id);

        let page = store.list(&a.tenant_id, &[], 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].notification_id, a.notification_id);
    }

    #[tokio::test]
    async fn reset_inflight_reverts_to_queued_on_boot() {
        let store = store().await;
        let now = Utc::now();
        let created = store.create(new_email(), now).await.unwrap();
        store
            .update_status(&created.tenant_id, &created.notification_id, Status::Queued, Status::Inflight, None, 0, now)
            .await
            .unwrap();

        let count = store.reset_inflight(now).await.unwrap();
        assert_eq!(count, 1);

        let fetched = store.get(&created.tenant_id, &created.notification_id).await.unwrap();
        assert_eq!(fetched.status, Status::Queued);
    }
}
