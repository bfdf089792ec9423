//! Citizen star ratings, one per user per politician

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use polirate_core::grade::POINTS_RATING;
use polirate_core::{LikeTarget, Paginated, Pagination, RatingScore, RatingSort, Sort};

use super::super::DbError;
use super::likes::{purge_likes, LikeRepo};
use super::profiles::{award_points, ensure_profile};
use super::fetch_page;
use crate::auth::AuthUser;

/// Rating with author nickname
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_nickname: String,
    pub politician_id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub liked: bool,
}

const SELECT_RATING: &str = r#"
    SELECT
        r.id, r.user_id, a.nickname AS author_nickname, r.politician_id,
        r.score, r.comment, r.like_count, r.created_at, r.updated_at
    FROM ratings r
    JOIN profiles a ON a.id = r.user_id
"#;

/// Rating repository
pub struct RatingRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> RatingRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        politician_id: Uuid,
        sort: Sort<RatingSort>,
        page: Pagination,
        viewer: Option<Uuid>,
    ) -> Result<Paginated<Rating>, DbError> {
        let sql = format!(
            r#"
            SELECT page.*, COUNT(*) OVER() AS total FROM ({SELECT_RATING}
                WHERE r.politician_id = $1
            ) page
            ORDER BY {order}
            LIMIT $2 OFFSET $3
            "#,
            order = sort.order_by("page"),
        );
        let (rows, total) = fetch_page(self.pool, page, |limit, offset| {
            sqlx::query(&sql)
                .bind(politician_id)
                .bind(limit)
                .bind(offset)
        })
        .await?;
        let mut items = rows
            .iter()
            .map(Rating::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(uid) = viewer {
            let ids: Vec<Uuid> = items.iter().map(|r| r.id).collect();
            let liked = LikeRepo::new(self.pool)
                .liked_ids(uid, LikeTarget::Rating, &ids)
                .await?;
            for item in &mut items {
                item.liked = liked.contains(&item.id);
            }
        }

        Ok(page.wrap(items, total))
    }

    /// The caller's own rating of a politician, if any.
    pub async fn mine(&self, user_id: Uuid, politician_id: Uuid) -> Result<Option<Rating>, DbError> {
        Ok(sqlx::query_as::<_, Rating>(&format!(
            "{SELECT_RATING} WHERE r.user_id = $1 AND r.politician_id = $2"
        ))
        .bind(user_id)
        .bind(politician_id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Create or replace the caller's rating. Returns `(rating, created)`.
    ///
    /// Points are awarded only the first time.
    pub async fn upsert(
        &self,
        user: &AuthUser,
        politician_id: Uuid,
        score: RatingScore,
        comment: Option<String>,
    ) -> Result<(Rating, bool), DbError> {
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

        // xmax = 0 only for rows this statement inserted
        let (_, created): (Uuid, bool) = sqlx::query_as(
            r#"
            INSERT INTO ratings (user_id, politician_id, score, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT ratings_user_politician_key DO UPDATE
                SET score = EXCLUDED.score, comment = EXCLUDED.comment, updated_at = NOW()
            RETURNING id, (xmax = 0) AS created
            "#,
        )
        .bind(user.id)
        .bind(politician_id)
        .bind(score.value())
        .bind(comment.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        if created {
            award_points(&mut tx, user.id, POINTS_RATING).await?;
        }

        tx.commit().await?;
        tracing::info!(user_id = %user.id, %politician_id, score = score.value(), created, "rating saved");

        let rating = self
            .mine(user.id, politician_id)
            .await?
            .ok_or_else(|| DbError::not_found("rating", politician_id))?;
        Ok((rating, created))
    }

    /// Remove the caller's rating of a politician.
    pub async fn delete(&self, user: &AuthUser, politician_id: Uuid) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let removed: Option<(Uuid,)> = sqlx::query_as(
            "DELETE FROM ratings WHERE user_id = $1 AND politician_id = $2 RETURNING id",
        )
        .bind(user.id)
        .bind(politician_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (id,) = removed.ok_or_else(|| DbError::not_found("rating", politician_id))?;
        purge_likes(&mut tx, LikeTarget::Rating, &[id]).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::ProfileRepo;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn upsert_replaces_and_awards_once() {
        let pool = pool().await;
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: None,
            role: None,
        };
        let (politician_id,): (Uuid,) =
            sqlx::query_as("INSERT INTO politicians (name) VALUES ('Rated') RETURNING id")
                .fetch_one(&pool)
                .await
                .unwrap();

        let repo = RatingRepo::new(&pool);
        let (first, created) = repo
            .upsert(&user, politician_id, RatingScore::new(4).unwrap(), None)
            .await
            .unwrap();
        assert!(created);
        assert_eq!(first.score, 4);

        let (second, created) = repo
            .upsert(
                &user,
                politician_id,
                RatingScore::new(2).unwrap(),
                Some("changed my mind".into()),
            )
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.score, 2);

        let profile = ProfileRepo::new(&pool).get(user.id).await.unwrap();
        assert_eq!(profile.points, POINTS_RATING);

        repo.delete(&user, politician_id).await.unwrap();
        assert!(repo.mine(user.id, politician_id).await.unwrap().is_none());
    }
}
