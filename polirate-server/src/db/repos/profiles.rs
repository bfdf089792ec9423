//! Profiles, points, and user stats
//!
//! Profiles are created lazily: the first write a user makes inserts their
//! row with a nickname derived from the token email.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use polirate_core::{activity_grade, influence_grade, Grade, Nickname};

use super::super::DbError;
use crate::auth::AuthUser;

/// Profile record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update. `avatar_url: Some(None)` clears the avatar.
#[derive(Debug, Default)]
pub struct ProfilePatch {
    pub nickname: Option<Nickname>,
    pub avatar_url: Option<Option<String>>,
}

/// Public activity summary for a user
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub nickname: String,
    pub points: i64,
    pub post_count: i64,
    pub comment_count: i64,
    pub rating_count: i64,
    pub follower_count: i64,
    pub following_count: i64,
    pub activity: Grade,
    pub influence: Grade,
}

const PROFILE_COLUMNS: &str = "id, nickname, avatar_url, points, created_at, updated_at";

/// Make sure `user` has a profile row and return its nickname.
///
/// Tries the email-derived nickname first, then the id-derived fallback if
/// that nickname is taken.
pub(crate) async fn ensure_profile(
    conn: &mut PgConnection,
    user: &AuthUser,
) -> Result<String, DbError> {
    if let Some(name) = nickname_of(conn, user.id).await? {
        return Ok(name);
    }

    let candidates = [
        Nickname::from_email_or_id(user.email.as_deref(), &user.id),
        Nickname::from_email_or_id(None, &user.id),
    ];

    for candidate in candidates {
        let inserted: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO profiles (id, nickname)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            RETURNING nickname
            "#,
        )
        .bind(user.id)
        .bind(candidate.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        if let Some((name,)) = inserted {
            tracing::info!(user_id = %user.id, nickname = %name, "created profile");
            return Ok(name);
        }

        // Either the nickname was taken or a concurrent request created the row
        if let Some(name) = nickname_of(conn, user.id).await? {
            return Ok(name);
        }
    }

    Err(DbError::Conflict(
        "could not allocate a nickname for this user".to_string(),
    ))
}

async fn nickname_of(conn: &mut PgConnection, id: Uuid) -> Result<Option<String>, DbError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT nickname FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(n,)| n))
}

/// Add `delta` activity points to a user.
pub(crate) async fn award_points(
    conn: &mut PgConnection,
    user_id: Uuid,
    delta: i64,
) -> Result<(), DbError> {
    sqlx::query("UPDATE profiles SET points = points + $2 WHERE id = $1")
        .bind(user_id)
        .bind(delta)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Profile repository
pub struct ProfileRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<Profile, DbError> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("profile", id))
    }

    /// The caller's own profile, created on first access.
    pub async fn me(&self, user: &AuthUser) -> Result<Profile, DbError> {
        let mut conn = self.pool.acquire().await?;
        ensure_profile(&mut conn, user).await?;
        drop(conn);
        self.get(user.id).await
    }

    pub async fn update(&self, user: &AuthUser, patch: ProfilePatch) -> Result<Profile, DbError> {
        let mut tx = self.pool.begin().await?;
        ensure_profile(&mut tx, user).await?;

        let (set_avatar, avatar) = match patch.avatar_url {
            Some(v) => (true, v),
            None => (false, None),
        };

        let profile: Profile = sqlx::query_as(&format!(
            r#"
            UPDATE profiles SET
                nickname = COALESCE($2, nickname),
                avatar_url = CASE WHEN $3 THEN $4 ELSE avatar_url END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(patch.nickname.as_ref().map(Nickname::as_str))
        .bind(set_avatar)
        .bind(avatar)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(profile)
    }

    /// Counts and grades for `id`.
    pub async fn stats(&self, id: Uuid) -> Result<UserStats, DbError> {
        let row: Option<(String, i64, i64, i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                p.nickname,
                p.points,
                (SELECT COUNT(*) FROM posts WHERE author_id = p.id),
                (SELECT COUNT(*) FROM comments WHERE author_id = p.id AND NOT deleted),
                (SELECT COUNT(*) FROM ratings WHERE user_id = p.id),
                (SELECT COUNT(*) FROM follows WHERE followee_id = p.id),
                (SELECT COUNT(*) FROM follows WHERE follower_id = p.id)
            FROM profiles p
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let (nickname, points, posts, comments, ratings, followers, following) =
            row.ok_or_else(|| DbError::not_found("profile", id))?;

        Ok(UserStats {
            user_id: id,
            nickname,
            points,
            post_count: posts,
            comment_count: comments,
            rating_count: ratings,
            follower_count: followers,
            following_count: following,
            activity: activity_grade(points),
            influence: influence_grade(followers),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();
        pool
    }

    fn user() -> AuthUser {
        let id = Uuid::new_v4();
        AuthUser {
            id,
            email: Some(format!("p{}@example.com", &id.simple().to_string()[..8])),
            role: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn ensure_is_idempotent() {
        let pool = pool().await;
        let user = user();

        let mut conn = pool.acquire().await.unwrap();
        let first = ensure_profile(&mut conn, &user).await.unwrap();
        let second = ensure_profile(&mut conn, &user).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn nickname_collision_falls_back_to_id() {
        let pool = pool().await;
        let a = user();
        let b = AuthUser {
            id: Uuid::new_v4(),
            email: a.email.clone(),
            role: None,
        };

        let mut conn = pool.acquire().await.unwrap();
        let name_a = ensure_profile(&mut conn, &a).await.unwrap();
        let name_b = ensure_profile(&mut conn, &b).await.unwrap();
        assert_ne!(name_a, name_b);
        assert!(name_b.starts_with("user-"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn fresh_user_stats() {
        let pool = pool().await;
        let user = user();
        ProfileRepo::new(&pool).me(&user).await.unwrap();

        let stats = ProfileRepo::new(&pool).stats(user.id).await.unwrap();
        assert_eq!(stats.points, 0);
        assert_eq!(stats.follower_count, 0);
        assert_eq!(stats.activity.level, 1);
    }
}
