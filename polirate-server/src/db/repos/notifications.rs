//! Notification inbox

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use polirate_core::{NotificationDraft, Paginated, Pagination};

use super::super::DbError;
use super::fetch_page;

/// Notification with the sender's nickname
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub sender_nickname: Option<String>,
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// List filters
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFilter {
    pub unread_only: bool,
    /// Only notifications created strictly after this instant (polling)
    pub since: Option<DateTime<Utc>>,
}

const SELECT_NOTIFICATION: &str = r#"
    SELECT
        n.id, n.recipient_id, n.sender_id, s.nickname AS sender_nickname,
        n.kind, n.title, n.body, n.link,
        (n.read_at IS NOT NULL) AS is_read, n.read_at, n.created_at
    FROM notifications n
    LEFT JOIN profiles s ON s.id = n.sender_id
"#;

/// Store a notification as part of the caller's transaction.
pub(crate) async fn insert_draft(
    conn: &mut PgConnection,
    draft: &NotificationDraft,
) -> Result<Uuid, DbError> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO notifications (recipient_id, sender_id, kind, title, body, link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(draft.recipient_id)
    .bind(draft.sender_id)
    .bind(draft.kind.as_str())
    .bind(&draft.title)
    .bind(draft.body.as_deref())
    .bind(draft.link.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(
        notification_id = %id,
        recipient = %draft.recipient_id,
        kind = draft.kind.as_str(),
        "notification queued"
    );
    Ok(id)
}

/// Store a draft if there is one.
pub(crate) async fn notify(
    conn: &mut PgConnection,
    draft: Option<NotificationDraft>,
) -> Result<(), DbError> {
    if let Some(draft) = draft {
        insert_draft(conn, &draft).await?;
    }
    Ok(())
}

/// Notification repository
pub struct NotificationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest first.
    pub async fn list(
        &self,
        recipient: Uuid,
        filter: NotificationFilter,
        page: Pagination,
    ) -> Result<Paginated<Notification>, DbError> {
        let sql = format!(
            r#"
            SELECT page.*, COUNT(*) OVER() AS total FROM ({SELECT_NOTIFICATION}
                WHERE n.recipient_id = $1
                  AND ($2 = FALSE OR n.read_at IS NULL)
                  AND ($3::timestamptz IS NULL OR n.created_at > $3)
            ) page
            ORDER BY page.created_at DESC, page.id DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let (rows, total) = fetch_page(self.pool, page, |limit, offset| {
            sqlx::query(&sql)
                .bind(recipient)
                .bind(filter.unread_only)
                .bind(filter.since)
                .bind(limit)
                .bind(offset)
        })
        .await?;
        let items = rows
            .iter()
            .map(Notification::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    pub async fn unread_count(&self, recipient: Uuid) -> Result<i64, DbError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND read_at IS NULL",
        )
        .bind(recipient)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Create a notification directly (service role).
    pub async fn create(&self, draft: &NotificationDraft) -> Result<Notification, DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_draft(&mut conn, draft).await?;
        drop(conn);
        self.get(draft.recipient_id, id).await
    }

    async fn get(&self, recipient: Uuid, id: Uuid) -> Result<Notification, DbError> {
        sqlx::query_as::<_, Notification>(&format!(
            "{SELECT_NOTIFICATION} WHERE n.id = $1 AND n.recipient_id = $2"
        ))
        .bind(id)
        .bind(recipient)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("notification", id))
    }

    /// Mark one notification read. Re-marking keeps the original `read_at`.
    pub async fn mark_read(&self, recipient: Uuid, id: Uuid) -> Result<Notification, DbError> {
        let updated = sqlx::query(
            r#"
            UPDATE notifications
            SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND recipient_id = $2
            "#,
        )
        .bind(id)
        .bind(recipient)
        .execute(self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::not_found("notification", id));
        }
        self.get(recipient, id).await
    }

    /// Mark everything read, returning how many changed.
    pub async fn mark_all_read(&self, recipient: Uuid) -> Result<u64, DbError> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = NOW() WHERE recipient_id = $1 AND read_at IS NULL",
        )
        .bind(recipient)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, recipient: Uuid, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("notification", id));
        }
        Ok(())
    }
}
