//! Politician bookmarks

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use polirate_core::{Paginated, Pagination};

use super::super::DbError;
use super::profiles::ensure_profile;
use super::fetch_page;
use crate::auth::AuthUser;

/// Bookmarked politician
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Bookmark {
    pub politician_id: Uuid,
    pub name: String,
    pub party: Option<String>,
    pub region: Option<String>,
    pub position: Option<String>,
    pub image_url: Option<String>,
    pub bookmarked_at: DateTime<Utc>,
}

/// Bookmark repository
pub struct BookmarkRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> BookmarkRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent first.
    pub async fn list(&self, user_id: Uuid, page: Pagination) -> Result<Paginated<Bookmark>, DbError> {
        let sql = r#"
            SELECT
                p.id AS politician_id, p.name, p.party, p.region, p.position, p.image_url,
                b.created_at AS bookmarked_at,
                COUNT(*) OVER() AS total
            FROM bookmarks b
            JOIN politicians p ON p.id = b.politician_id
            WHERE b.user_id = $1
            ORDER BY b.created_at DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#;
        let (rows, total) = fetch_page(self.pool, page, |limit, offset| {
            sqlx::query(sql)
                .bind(user_id)
                .bind(limit)
                .bind(offset)
        })
        .await?;
        let items = rows
            .iter()
            .map(Bookmark::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    /// Bookmarking twice is a conflict; an unknown politician is not found.
    pub async fn add(&self, user: &AuthUser, politician_id: Uuid) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        ensure_profile(&mut tx, user).await?;

        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM politicians WHERE id = $1)")
                .bind(politician_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(DbError::not_found("politician", politician_id));
        }

        sqlx::query("INSERT INTO bookmarks (user_id, politician_id) VALUES ($1, $2)")
            .bind(user.id)
            .bind(politician_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn remove(&self, user_id: Uuid, politician_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND politician_id = $2")
            .bind(user_id)
            .bind(politician_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("bookmark", politician_id));
        }
        Ok(())
    }
}
