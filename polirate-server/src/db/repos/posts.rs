//! Community posts

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use polirate_core::grade::POINTS_POST;
use polirate_core::{LikeTarget, Paginated, Pagination, PostCategory, PostContent, PostSort, PostTitle, Sort};

use super::super::DbError;
use super::likes::purge_likes;
use super::profiles::{award_points, ensure_profile};
use super::{fetch_page, like_pattern};
use crate::auth::AuthUser;

/// Post with author nickname
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_nickname: String,
    pub politician_id: Option<Uuid>,
    pub category: String,
    pub title: String,
    pub content: String,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List filters
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category: Option<PostCategory>,
    pub politician_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    /// Substring match on title
    pub q: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: PostTitle,
    pub content: PostContent,
    pub category: PostCategory,
    pub politician_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<PostTitle>,
    pub content: Option<PostContent>,
    pub category: Option<PostCategory>,
}

const POST_COLUMNS: &str = r#"
    p.id, p.author_id, a.nickname AS author_nickname, p.politician_id, p.category,
    p.title, p.content, p.view_count, p.like_count, p.comment_count,
    p.created_at, p.updated_at
"#;

/// Post repository
pub struct PostRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PostRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &PostFilter,
        sort: Sort<PostSort>,
        page: Pagination,
    ) -> Result<Paginated<Post>, DbError> {
        let q = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let sql = format!(
            r#"
            SELECT page.*, COUNT(*) OVER() AS total FROM (
                SELECT {POST_COLUMNS}
                FROM posts p
                JOIN profiles a ON a.id = p.author_id
                WHERE ($1::text IS NULL OR p.category = $1)
                  AND ($2::uuid IS NULL OR p.politician_id = $2)
                  AND ($3::uuid IS NULL OR p.author_id = $3)
                  AND ($4::text IS NULL OR p.title ILIKE $4)
            ) page
            ORDER BY {order}
            LIMIT $5 OFFSET $6
            "#,
            order = sort.order_by("page"),
        );
        let (rows, total) = fetch_page(self.pool, page, |limit, offset| {
            sqlx::query(&sql)
                .bind(filter.category.map(|c| c.as_str()))
                .bind(filter.politician_id)
                .bind(filter.author_id)
                .bind(q.as_deref())
                .bind(limit)
                .bind(offset)
        })
        .await?;
        let items = rows
            .iter()
            .map(Post::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    /// Fetch a post without touching its view count.
    pub async fn get(&self, id: Uuid) -> Result<Post, DbError> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p JOIN profiles a ON a.id = p.author_id WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("post", id))
    }

    /// Fetch a post and count the view in one statement.
    pub async fn view(&self, id: Uuid) -> Result<Post, DbError> {
        sqlx::query_as::<_, Post>(&format!(
            r#"
            WITH p AS (
                UPDATE posts SET view_count = view_count + 1
                WHERE id = $1
                RETURNING *
            )
            SELECT {POST_COLUMNS} FROM p JOIN profiles a ON a.id = p.author_id
            "#
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("post", id))
    }

    pub async fn create(&self, user: &AuthUser, new: NewPost) -> Result<Post, DbError> {
        let mut tx = self.pool.begin().await?;
        ensure_profile(&mut tx, user).await?;

        if let Some(pid) = new.politician_id {
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM politicians WHERE id = $1)")
                    .bind(pid)
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                return Err(DbError::not_found("politician", pid));
            }
        }

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO posts (author_id, politician_id, category, title, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(new.politician_id)
        .bind(new.category.as_str())
        .bind(new.title.as_str())
        .bind(new.content.as_str())
        .fetch_one(&mut *tx)
        .await?;

        award_points(&mut tx, user.id, POINTS_POST).await?;
        tx.commit().await?;

        tracing::info!(post_id = %id, author = %user.id, "post created");
        self.get(id).await
    }

    /// Author only.
    pub async fn update(&self, user: &AuthUser, id: Uuid, patch: PostPatch) -> Result<Post, DbError> {
        let mut tx = self.pool.begin().await?;
        self.check_author(&mut tx, user, id, false).await?;

        sqlx::query(
            r#"
            UPDATE posts SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                category = COALESCE($4, category),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.title.as_ref().map(PostTitle::as_str))
        .bind(patch.content.as_ref().map(PostContent::as_str))
        .bind(patch.category.map(|c| c.as_str()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get(id).await
    }

    /// Author or service role. Comments go with the post.
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        self.check_author(&mut tx, user, id, true).await?;

        let comment_ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM comments WHERE post_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        let comment_ids: Vec<Uuid> = comment_ids.into_iter().map(|(c,)| c).collect();
        purge_likes(&mut tx, LikeTarget::Comment, &comment_ids).await?;

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(post_id = %id, comments = comment_ids.len(), "post deleted");
        Ok(())
    }

    async fn check_author(
        &self,
        conn: &mut sqlx::PgConnection,
        user: &AuthUser,
        id: Uuid,
        service_allowed: bool,
    ) -> Result<(), DbError> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT author_id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        let (author,) = row.ok_or_else(|| DbError::not_found("post", id))?;
        if author != user.id && !(service_allowed && user.is_service()) {
            return Err(DbError::Forbidden("only the author can change this post".to_string()));
        }
        Ok(())
    }
}
