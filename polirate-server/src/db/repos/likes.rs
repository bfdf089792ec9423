//! Likes on ratings and comments
//!
//! `likes` is polymorphic (`target_type`, `target_id`), so the like count
//! lives on the target row and is adjusted in the same transaction as the
//! like itself.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use polirate_core::{LikeTarget, NotificationDraft};

use super::super::DbError;
use super::notifications::notify;
use super::profiles::ensure_profile;
use crate::auth::AuthUser;

/// Like state of one target after a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub target_id: Uuid,
    pub liked: bool,
    pub like_count: i64,
}

/// Lock the target row and return its author, or 404.
async fn target_author(
    conn: &mut PgConnection,
    target: LikeTarget,
    id: Uuid,
) -> Result<Uuid, DbError> {
    let live = match target {
        LikeTarget::Comment => " AND NOT deleted",
        LikeTarget::Rating => "",
    };
    let row: Option<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT {} FROM {} WHERE id = $1{} FOR UPDATE",
        target.author_column(),
        target.table(),
        live
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|(author,)| author)
        .ok_or_else(|| DbError::not_found(target.as_str(), id))
}

/// Remove every like pointing at `ids`. Used when targets are deleted.
pub(crate) async fn purge_likes(
    conn: &mut PgConnection,
    target: LikeTarget,
    ids: &[Uuid],
) -> Result<(), DbError> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM likes WHERE target_type = $1 AND target_id = ANY($2)")
        .bind(target.as_str())
        .bind(ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Like repository
pub struct LikeRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LikeRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Like a target. Liking twice is a conflict.
    pub async fn like(
        &self,
        user: &AuthUser,
        target: LikeTarget,
        target_id: Uuid,
    ) -> Result<LikeState, DbError> {
        let mut tx = self.pool.begin().await?;
        let nickname = ensure_profile(&mut tx, user).await?;
        let author = target_author(&mut tx, target, target_id).await?;

        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO likes (user_id, target_type, target_id)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT likes_user_target_key DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(target.as_str())
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            return Err(DbError::Conflict(format!("{} already liked", target)));
        }

        let (like_count,): (i64,) = sqlx::query_as(&format!(
            "UPDATE {} SET like_count = like_count + 1 WHERE id = $1 RETURNING like_count",
            target.table()
        ))
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;

        notify(
            &mut tx,
            NotificationDraft::like(author, user.id, &nickname, target),
        )
        .await?;

        tx.commit().await?;
        tracing::debug!(user_id = %user.id, %target, %target_id, like_count, "liked");

        Ok(LikeState {
            target_id,
            liked: true,
            like_count,
        })
    }

    /// Remove a like. Counts never go below zero.
    pub async fn unlike(
        &self,
        user: &AuthUser,
        target: LikeTarget,
        target_id: Uuid,
    ) -> Result<LikeState, DbError> {
        let mut tx = self.pool.begin().await?;

        let removed: Option<(Uuid,)> = sqlx::query_as(
            r#"
            DELETE FROM likes
            WHERE user_id = $1 AND target_type = $2 AND target_id = $3
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(target.as_str())
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;

        if removed.is_none() {
            return Err(DbError::not_found("like", target_id));
        }

        let count: Option<(i64,)> = sqlx::query_as(&format!(
            r#"
            UPDATE {} SET like_count = GREATEST(like_count - 1, 0)
            WHERE id = $1
            RETURNING like_count
            "#,
            target.table()
        ))
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(LikeState {
            target_id,
            liked: false,
            like_count: count.map(|(c,)| c).unwrap_or(0),
        })
    }

    /// Which of `ids` the user has liked.
    pub async fn liked_ids(
        &self,
        user_id: Uuid,
        target: LikeTarget,
        ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, DbError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT target_id FROM likes
            WHERE user_id = $1 AND target_type = $2 AND target_id = ANY($3)
            "#,
        )
        .bind(user_id)
        .bind(target.as_str())
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Like state for a batch of targets, in the order of `ids`.
    ///
    /// Unknown ids are reported with a zero count.
    pub async fn status(
        &self,
        user_id: Option<Uuid>,
        target: LikeTarget,
        ids: &[Uuid],
    ) -> Result<Vec<LikeState>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let counts: HashMap<Uuid, i64> = sqlx::query_as::<_, (Uuid, i64)>(&format!(
            "SELECT id, like_count FROM {} WHERE id = ANY($1)",
            target.table()
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .collect();

        let liked = match user_id {
            Some(uid) => self.liked_ids(uid, target, ids).await?,
            None => HashSet::new(),
        };

        Ok(ids
            .iter()
            .map(|id| LikeState {
                target_id: *id,
                liked: liked.contains(id),
                like_count: counts.get(id).copied().unwrap_or(0),
            })
            .collect())
    }
}
