//! Comments with one level of replies
//!
//! Listing is three queries regardless of page size: the top-level page,
//! every reply of that page, and the viewer's likes across both.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use polirate_core::grade::POINTS_COMMENT;
use polirate_core::{
    assemble_threads, child_depth, CommentContent, CommentSort, CommentTarget, CommentThread,
    LikeTarget, NotificationDraft, Paginated, Pagination, Sort, Threaded,
};

use super::super::DbError;
use super::likes::{purge_likes, LikeRepo};
use super::notifications::notify;
use super::profiles::{award_points, ensure_profile};
use super::fetch_page;
use crate::auth::AuthUser;

/// Comment with author nickname. Deleted comments keep their place in a
/// thread with empty content.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_nickname: String,
    pub post_id: Option<Uuid>,
    pub politician_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub depth: i16,
    pub content: String,
    pub like_count: i64,
    pub reply_count: i64,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub liked: bool,
}

impl Threaded for Comment {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    fn set_liked(&mut self, liked: bool) {
        self.liked = liked;
    }
}

/// What happened on delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub id: Uuid,
    /// `true` when the comment had replies and was blanked instead of removed
    pub soft: bool,
}

const SELECT_COMMENT: &str = r#"
    SELECT
        c.id, c.author_id, a.nickname AS author_nickname,
        c.post_id, c.politician_id, c.parent_id, c.depth,
        CASE WHEN c.deleted THEN '' ELSE c.content END AS content,
        c.like_count, c.reply_count, c.deleted, c.created_at, c.updated_at
    FROM comments c
    JOIN profiles a ON a.id = c.author_id
"#;

fn target_column(target: &CommentTarget) -> (&'static str, Uuid) {
    match target {
        CommentTarget::Post(id) => ("post_id", *id),
        CommentTarget::Politician(id) => ("politician_id", *id),
    }
}

fn comment_link(target: &CommentTarget, comment_id: Uuid) -> String {
    match target {
        CommentTarget::Post(id) => format!("/posts/{}#comment-{}", id, comment_id),
        CommentTarget::Politician(id) => format!("/politicians/{}#comment-{}", id, comment_id),
    }
}

/// Parent row as seen by a new reply
struct ParentRow {
    author_id: Uuid,
    depth: i16,
    post_id: Option<Uuid>,
    politician_id: Option<Uuid>,
    deleted: bool,
}

async fn lock_parent(conn: &mut PgConnection, id: Uuid) -> Result<ParentRow, DbError> {
    let row: Option<(Uuid, i16, Option<Uuid>, Option<Uuid>, bool)> = sqlx::query_as(
        r#"
        SELECT author_id, depth, post_id, politician_id, deleted
        FROM comments WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let (author_id, depth, post_id, politician_id, deleted) =
        row.ok_or_else(|| DbError::not_found("comment", id))?;

    Ok(ParentRow {
        author_id,
        depth,
        post_id,
        politician_id,
        deleted,
    })
}

/// Author of the commented-on post, `None` for politician targets; 404 if
/// the target does not exist.
async fn target_owner(
    conn: &mut PgConnection,
    target: &CommentTarget,
) -> Result<Option<Uuid>, DbError> {
    match target {
        CommentTarget::Post(id) => {
            let row: Option<(Uuid,)> = sqlx::query_as("SELECT author_id FROM posts WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
            row.map(|(author,)| Some(author))
                .ok_or_else(|| DbError::not_found("post", id))
        }
        CommentTarget::Politician(id) => {
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM politicians WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&mut *conn)
                    .await?;
            if !exists {
                return Err(DbError::not_found("politician", id));
            }
            Ok(None)
        }
    }
}

/// Comment repository
pub struct CommentRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CommentRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<Comment, DbError> {
        sqlx::query_as::<_, Comment>(&format!("{SELECT_COMMENT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("comment", id))
    }

    /// Top-level comments of `target`, each with all of its replies.
    ///
    /// Pagination and sort apply to top-level comments; replies are oldest
    /// first. `liked` is set for `viewer`.
    pub async fn list(
        &self,
        target: CommentTarget,
        sort: Sort<CommentSort>,
        page: Pagination,
        viewer: Option<Uuid>,
    ) -> Result<Paginated<CommentThread<Comment>>, DbError> {
        let (column, target_id) = target_column(&target);

        let sql = format!(
            r#"
            SELECT page.*, COUNT(*) OVER() AS total FROM ({SELECT_COMMENT}
                WHERE c.{column} = $1 AND c.parent_id IS NULL
            ) page
            ORDER BY {order}
            LIMIT $2 OFFSET $3
            "#,
            order = sort.order_by("page"),
        );
        let (rows, total) = fetch_page(self.pool, page, |limit, offset| {
            sqlx::query(&sql)
                .bind(target_id)
                .bind(limit)
                .bind(offset)
        })
        .await?;
        let top_level = rows
            .iter()
            .map(Comment::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let parent_ids: Vec<Uuid> = top_level.iter().map(|c| c.id).collect();
        let replies: Vec<Comment> = if parent_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as(&format!(
                "{SELECT_COMMENT} WHERE c.parent_id = ANY($1) ORDER BY c.created_at ASC, c.id ASC"
            ))
            .bind(&parent_ids)
            .fetch_all(self.pool)
            .await?
        };

        let liked = match viewer {
            Some(uid) => {
                let all_ids: Vec<Uuid> = parent_ids
                    .iter()
                    .copied()
                    .chain(replies.iter().map(|r| r.id))
                    .collect();
                LikeRepo::new(self.pool)
                    .liked_ids(uid, LikeTarget::Comment, &all_ids)
                    .await?
            }
            None => Default::default(),
        };

        tracing::debug!(
            %target_id,
            top_level = top_level.len(),
            replies = replies.len(),
            "loaded comment page"
        );

        Ok(page.wrap(assemble_threads(top_level, replies, &liked), total))
    }

    /// Create a comment or reply.
    ///
    /// Reply count, post comment count, author points and the notification
    /// are written in the same transaction as the comment.
    pub async fn create(
        &self,
        user: &AuthUser,
        target: CommentTarget,
        parent_id: Option<Uuid>,
        content: CommentContent,
    ) -> Result<Comment, DbError> {
        let mut tx = self.pool.begin().await?;
        let nickname = ensure_profile(&mut tx, user).await?;

        let parent = match parent_id {
            Some(pid) => {
                let parent = lock_parent(&mut tx, pid).await?;
                if parent.post_id != target.post_id()
                    || parent.politician_id != target.politician_id()
                {
                    return Err(DbError::Invalid(polirate_core::ValidationError::InvalidFormat {
                        field: "parent_id",
                        reason: "parent comment belongs to a different target",
                    }));
                }
                if parent.deleted {
                    return Err(DbError::InvalidState(
                        "cannot reply to a deleted comment".to_string(),
                    ));
                }
                Some((pid, parent))
            }
            None => None,
        };

        let depth = child_depth(parent.as_ref().map(|(_, p)| p.depth))?;
        let post_owner = target_owner(&mut tx, &target).await?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO comments (author_id, post_id, politician_id, parent_id, depth, content)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(target.post_id())
        .bind(target.politician_id())
        .bind(parent_id)
        .bind(depth)
        .bind(content.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(pid) = parent_id {
            sqlx::query("UPDATE comments SET reply_count = reply_count + 1 WHERE id = $1")
                .bind(pid)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(post_id) = target.post_id() {
            sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = $1")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
        }

        award_points(&mut tx, user.id, POINTS_COMMENT).await?;

        let link = comment_link(&target, id);
        let draft = match (&parent, post_owner) {
            (Some((_, p)), _) => {
                NotificationDraft::reply(p.author_id, user.id, &nickname, content.as_str(), link)
            }
            (None, Some(owner)) => {
                NotificationDraft::comment(owner, user.id, &nickname, content.as_str(), link)
            }
            (None, None) => None,
        };
        notify(&mut tx, draft).await?;

        tx.commit().await?;
        tracing::info!(comment_id = %id, author = %user.id, depth, "comment created");

        self.get(id).await
    }

    /// Edit a comment's content. Author only.
    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        content: CommentContent,
    ) -> Result<Comment, DbError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Uuid, bool)> =
            sqlx::query_as("SELECT author_id, deleted FROM comments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        match row {
            None | Some((_, true)) => return Err(DbError::not_found("comment", id)),
            Some((author, _)) if author != user.id => {
                return Err(DbError::Forbidden(
                    "only the author can edit this comment".to_string(),
                ))
            }
            Some(_) => {}
        }

        sqlx::query("UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(content.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.get(id).await
    }

    /// Delete a comment. Author or service role.
    ///
    /// A comment with replies is blanked so the thread stays intact; the
    /// blank placeholder is removed once its last reply goes.
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<DeleteOutcome, DbError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Uuid, Option<Uuid>, Option<Uuid>, i64, bool)> = sqlx::query_as(
            r#"
            SELECT author_id, parent_id, post_id, reply_count, deleted
            FROM comments WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let (author, parent_id, post_id, reply_count, deleted) =
            row.ok_or_else(|| DbError::not_found("comment", id))?;

        if deleted {
            return Err(DbError::not_found("comment", id));
        }
        if author != user.id && !user.is_service() {
            return Err(DbError::Forbidden(
                "only the author can delete this comment".to_string(),
            ));
        }

        purge_likes(&mut tx, LikeTarget::Comment, &[id]).await?;

        let soft = reply_count > 0;
        if soft {
            sqlx::query(
                r#"
                UPDATE comments
                SET deleted = TRUE, content = '', like_count = 0, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            if let Some(pid) = parent_id {
                release_parent(&mut tx, pid).await?;
            }
        }

        if let Some(post_id) = post_id {
            sqlx::query(
                "UPDATE posts SET comment_count = GREATEST(comment_count - 1, 0) WHERE id = $1",
            )
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(comment_id = %id, soft, "comment deleted");

        Ok(DeleteOutcome { id, soft })
    }
}

/// Decrement a parent's reply count, removing it if it is a blanked
/// placeholder with nothing left under it.
async fn release_parent(conn: &mut PgConnection, parent_id: Uuid) -> Result<(), DbError> {
    let row: Option<(i64, bool)> = sqlx::query_as(
        r#"
        UPDATE comments SET reply_count = GREATEST(reply_count - 1, 0)
        WHERE id = $1
        RETURNING reply_count, deleted
        "#,
    )
    .bind(parent_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((0, true)) = row {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(parent_id)
            .execute(&mut *conn)
            .await?;
        tracing::debug!(comment_id = %parent_id, "removed empty placeholder");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::{NotificationRepo, ProfileRepo};

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();
        pool
    }

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: None,
            role: None,
        }
    }

    async fn politician_target(pool: &PgPool) -> CommentTarget {
        let (id,): (Uuid,) =
            sqlx::query_as("INSERT INTO politicians (name) VALUES ('Thread Test') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        CommentTarget::Politician(id)
    }

    fn text(s: &str) -> CommentContent {
        CommentContent::new(s).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn reply_to_reply_rejected() {
        let pool = pool().await;
        let repo = CommentRepo::new(&pool);
        let me = user();
        let target = politician_target(&pool).await;

        let top = repo.create(&me, target, None, text("top")).await.unwrap();
        let reply = repo
            .create(&me, target, Some(top.id), text("reply"))
            .await
            .unwrap();
        assert_eq!(reply.depth, 1);

        let nested = repo.create(&me, target, Some(reply.id), text("nested")).await;
        assert!(matches!(nested, Err(DbError::Invalid(_))));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn list_groups_replies_under_parents() {
        let pool = pool().await;
        let repo = CommentRepo::new(&pool);
        let author = user();
        let replier = user();
        let target = politician_target(&pool).await;

        let first = repo.create(&author, target, None, text("first")).await.unwrap();
        let second = repo.create(&author, target, None, text("second")).await.unwrap();
        repo.create(&replier, target, Some(first.id), text("r1"))
            .await
            .unwrap();
        repo.create(&replier, target, Some(first.id), text("r2"))
            .await
            .unwrap();

        let page = repo
            .list(target, Sort::default(), Pagination::new(1, 20), Some(author.id))
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        // Newest first by default
        assert_eq!(page.items[0].comment.id, second.id);
        let first_thread = &page.items[1];
        assert_eq!(first_thread.comment.reply_count, 2);
        let contents: Vec<_> = first_thread.replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["r1", "r2"]);

        // Two replies notified the author
        assert_eq!(
            NotificationRepo::new(&pool).unread_count(author.id).await.unwrap(),
            2
        );
        // Points for both replies
        assert_eq!(
            ProfileRepo::new(&pool).get(replier.id).await.unwrap().points,
            2 * POINTS_COMMENT
        );
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn page_past_end_keeps_total() {
        let pool = pool().await;
        let repo = CommentRepo::new(&pool);
        let me = user();
        let target = politician_target(&pool).await;

        for body in ["one", "two", "three"] {
            repo.create(&me, target, None, text(body)).await.unwrap();
        }

        let last = repo
            .list(target, Sort::default(), Pagination::new(2, 2), None)
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.total, 3);

        let past = repo
            .list(target, Sort::default(), Pagination::new(3, 2), None)
            .await
            .unwrap();
        assert!(past.items.is_empty());
        assert_eq!(past.total, 3);
        let meta = past.meta();
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn delete_with_replies_is_soft() {
        let pool = pool().await;
        let repo = CommentRepo::new(&pool);
        let me = user();
        let target = politician_target(&pool).await;

        let top = repo.create(&me, target, None, text("top")).await.unwrap();
        let reply = repo
            .create(&me, target, Some(top.id), text("reply"))
            .await
            .unwrap();

        let outcome = repo.delete(&me, top.id).await.unwrap();
        assert!(outcome.soft);
        let blank = repo.get(top.id).await.unwrap();
        assert!(blank.deleted);
        assert!(blank.content.is_empty());

        // Removing the last reply takes the placeholder with it
        let outcome = repo.delete(&me, reply.id).await.unwrap();
        assert!(!outcome.soft);
        assert!(matches!(repo.get(top.id).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn only_author_edits() {
        let pool = pool().await;
        let repo = CommentRepo::new(&pool);
        let me = user();
        let target = politician_target(&pool).await;

        let c = repo.create(&me, target, None, text("mine")).await.unwrap();
        let err = repo.update(&user(), c.id, text("hijack")).await.unwrap_err();
        assert!(matches!(err, DbError::Forbidden(_)));

        let edited = repo.update(&me, c.id, text("edited")).await.unwrap();
        assert_eq!(edited.content, "edited");
    }
}
