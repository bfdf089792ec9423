//! User follows

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use polirate_core::{NotificationDraft, Paginated, Pagination, ValidationError};

use super::super::DbError;
use super::notifications::notify;
use super::profiles::ensure_profile;
use super::fetch_page;
use crate::auth::AuthUser;

/// Follower or followee entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FollowUser {
    pub user_id: Uuid,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub followed_at: DateTime<Utc>,
}

/// Which side of the relation to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDirection {
    Followers,
    Following,
}

/// Follow repository
pub struct FollowRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> FollowRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn follow(&self, user: &AuthUser, followee: Uuid) -> Result<(), DbError> {
        if user.id == followee {
            return Err(ValidationError::InvalidFormat {
                field: "user_id",
                reason: "cannot follow yourself",
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        let nickname = ensure_profile(&mut tx, user).await?;

        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM profiles WHERE id = $1)")
            .bind(followee)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(DbError::not_found("user", followee));
        }

        sqlx::query("INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2)")
            .bind(user.id)
            .bind(followee)
            .execute(&mut *tx)
            .await?;

        notify(&mut tx, NotificationDraft::follow(followee, user.id, &nickname)).await?;

        tx.commit().await?;
        tracing::debug!(follower = %user.id, %followee, "followed");
        Ok(())
    }

    pub async fn unfollow(&self, user_id: Uuid, followee: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
            .bind(user_id)
            .bind(followee)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("follow", followee));
        }
        Ok(())
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        direction: FollowDirection,
        page: Pagination,
    ) -> Result<Paginated<FollowUser>, DbError> {
        let (match_col, other_col) = match direction {
            FollowDirection::Followers => ("followee_id", "follower_id"),
            FollowDirection::Following => ("follower_id", "followee_id"),
        };

        let sql = format!(
            r#"
            SELECT
                u.id AS user_id, u.nickname, u.avatar_url, f.created_at AS followed_at,
                COUNT(*) OVER() AS total
            FROM follows f
            JOIN profiles u ON u.id = f.{other_col}
            WHERE f.{match_col} = $1
            ORDER BY f.created_at DESC, u.id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let (rows, total) = fetch_page(self.pool, page, |limit, offset| {
            sqlx::query(&sql)
                .bind(user_id)
                .bind(limit)
                .bind(offset)
        })
        .await?;
        let items = rows
            .iter()
            .map(FollowUser::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }
}
